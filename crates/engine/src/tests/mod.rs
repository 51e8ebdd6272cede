//! Engine unit tests over a shared fixture dataset


mod engine_test;
