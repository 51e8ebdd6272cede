//! Shared fixture files for integration tests

use anyhow::Result;
use cinematch_engine::{DatasetConfig, EngineConfig};
use std::fs;
use tempfile::TempDir;

pub const ITEMS: &str = "\
1|Toy Story (1995)|01-Jan-1995||http://us.imdb.com/M/title-exact?Toy%20Story%20(1995)|0|0|0|1|1|1|0|0|0|0|0|0|0|0|0|0|0|0|0
2|GoldenEye (1995)|01-Jan-1995||http://us.imdb.com/M/title-exact?GoldenEye%20(1995)|0|1|1|0|0|0|0|0|0|0|0|0|0|0|0|0|1|0|0
3|Four Rooms (1995)|01-Jan-1995||http://us.imdb.com/M/title-exact?Four%20Rooms%20(1995)|0|0|0|0|0|0|0|0|0|0|0|0|0|0|0|0|1|0|0
4|Get Shorty (1995)|01-Jan-1995||http://us.imdb.com/M/title-exact?Get%20Shorty%20(1995)|0|1|0|0|0|1|0|0|1|0|0|0|0|0|0|0|0|0|0
5|Copycat (1995)|01-Jan-1995||http://us.imdb.com/M/title-exact?Copycat%20(1995)|0|0|0|0|0|0|1|0|1|0|0|0|0|0|0|0|1|0|0
6|Babe (1995)|01-Jan-1995||http://us.imdb.com/M/title-exact?Babe%20(1995)|0|0|0|0|1|1|0|0|1|0|0|0|0|0|0|0|0|0|0
";

pub const RATINGS: &str = "\
1\t1\t5\t881250949
1\t2\t3\t881250950
1\t4\t4\t881250951
1\t6\t5\t881250952
2\t1\t4\t881250953
2\t2\t2\t881250954
2\t3\t1\t881250955
2\t4\t4\t881250956
2\t6\t4\t881250957
3\t1\t1\t881250958
3\t2\t5\t881250959
3\t3\t4\t881250960
3\t5\t5\t881250961
4\t2\t4\t881250962
4\t3\t5\t881250963
4\t4\t2\t881250964
4\t5\t4\t881250965
4\t6\t1\t881250966
5\t1\t5\t881250967
5\t6\t5\t881250968
5\t5\t2\t881250969
";

/// Fixture files on disk; the directory lives as long as the value
pub struct Fixture {
    pub dir: TempDir,
    pub config: EngineConfig,
}

pub fn write_fixture(ratings: &str, items: &str) -> Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let ratings_path = dir.path().join("u.data");
    let items_path = dir.path().join("u.item");
    fs::write(&ratings_path, ratings)?;
    fs::write(&items_path, items)?;

    let config = EngineConfig {
        dataset: DatasetConfig {
            ratings_path,
            items_path,
        },
        ..Default::default()
    };
    Ok(Fixture { dir, config })
}

pub fn default_fixture() -> Result<Fixture> {
    write_fixture(RATINGS, ITEMS)
}
