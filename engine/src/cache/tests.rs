use std::path::Path;
use anyhow::Result;
use googletest::prelude::*;

use super::*;
use crate::{
    ErrorKind, ToolOutput,
    testutil::{FakeTool, NODEMAP_XML},
};

const SOURCE_NAME: &str = "terrain.tor";

fn setup(tempdir: &Path) -> anyhow::Result<PathBuf> {
    testutils::write_fixture(tempdir, SOURCE_NAME, "graph v1")
}

#[gtest]
#[test_log::test]
fn test_compiles_once_while_unchanged() -> Result<()> {
    // GIVEN: a source that has never been compiled.
    let tempdir = tempfile::tempdir()?;
    let source = setup(tempdir.path())?;
    let cache = DescriptorCache::new(FakeTool::compiling(NODEMAP_XML));

    // WHEN: it is resolved twice.
    let first = cache.resolve(&source)?;
    let second = cache.resolve(&source)?;

    // THEN: the tool ran once, with the nodemap flag.
    expect_that!(cache.tool().num_calls(), eq(1));
    expect_that!(cache.tool().calls()[0][1], eq(&OsString::from(NODEMAP_FLAG)));
    expect_that!(first.transition, eq(CacheTransition::Built));
    expect_that!(second.transition, eq(CacheTransition::Reused));
    expect_that!(second.digest, eq(first.digest));
    expect_that!(std::fs::read_to_string(&second.descriptor_path)?, eq(NODEMAP_XML));
    Ok(())
}

#[gtest]
#[test_log::test]
fn test_recompiles_after_source_change() -> Result<()> {
    let tempdir = tempfile::tempdir()?;
    let source = setup(tempdir.path())?;
    let cache = DescriptorCache::new(FakeTool::compiling(NODEMAP_XML));
    let first = cache.resolve(&source)?;

    // GIVEN: a single byte of the source changes.
    std::fs::write(&source, "graph v2")?;
    expect_that!(cache.state(&source)?, eq(CacheState::Stale));

    // WHEN: it is resolved again.
    let second = cache.resolve(&source)?;

    // THEN: it was rebuilt against the new digest.
    expect_that!(cache.tool().num_calls(), eq(2));
    expect_that!(second.transition, eq(CacheTransition::Rebuilt));
    expect_that!(second.digest, not(eq(first.digest)));
    expect_that!(second.digest, eq(HashDigest::of_bytes(b"graph v2")));
    expect_that!(cache.state(&source)?, eq(CacheState::Fresh));
    Ok(())
}

#[gtest]
fn test_failed_compile_leaves_no_record() -> Result<()> {
    // GIVEN: a build tool that fails.
    let tempdir = tempfile::tempdir()?;
    let source = setup(tempdir.path())?;
    let cache = DescriptorCache::new(FakeTool::failing(2, "bad graph"));

    // WHEN: the source is resolved.
    let err = cache.resolve(&source).unwrap_err();

    // THEN: the error carries the tool's stderr, and nothing was recorded.
    expect_that!(err.kind(), eq(ErrorKind::Compile));
    expect_that!(err.stderr(), some(eq("bad graph")));
    expect_that!(
        testutils::list_files(tempdir.path())?,
        eq(&vec![PathBuf::from(SOURCE_NAME)])
    );
    expect_that!(cache.state(&source)?, eq(CacheState::Unbuilt));
    Ok(())
}

#[gtest]
fn test_failed_recompile_keeps_previous_record() -> Result<()> {
    let tempdir = tempfile::tempdir()?;
    let source = setup(tempdir.path())?;
    let built = DescriptorCache::new(FakeTool::compiling(NODEMAP_XML)).resolve(&source)?;
    let record_path = DescriptorCache::<FakeTool>::record_path(&built.source_path);
    let record_before = std::fs::read_to_string(&record_path)?;

    // GIVEN: the source changes, and the build tool now fails.
    std::fs::write(&source, "graph v2")?;
    let cache = DescriptorCache::new(FakeTool::failing(1, ""));

    // WHEN: the source is resolved.
    let err = cache.resolve(&source).unwrap_err();

    // THEN: the old record is intact, and the descriptor is still stale.
    expect_that!(err.kind(), eq(ErrorKind::Compile));
    expect_that!(std::fs::read_to_string(&record_path)?, eq(&record_before));
    expect_that!(cache.state(&source)?, eq(CacheState::Stale));
    Ok(())
}

#[gtest]
fn test_missing_output_is_compile_error() -> Result<()> {
    let tempdir = tempfile::tempdir()?;
    let source = setup(tempdir.path())?;
    let cache = DescriptorCache::new(FakeTool::new(|_| Ok(ToolOutput::success())));

    let err = cache.resolve(&source).unwrap_err();

    expect_that!(err.kind(), eq(ErrorKind::Compile));
    expect_that!(cache.state(&source)?, eq(CacheState::Unbuilt));
    Ok(())
}

#[gtest]
fn test_concurrent_resolves_compile_once() -> Result<()> {
    let tempdir = tempfile::tempdir()?;
    let source = setup(tempdir.path())?;
    let cache = DescriptorCache::new(FakeTool::compiling(NODEMAP_XML));

    let results: Vec<crate::Result<CachedDescriptor>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| cache.resolve(&source)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("resolver thread panicked"))
            .collect()
    });

    expect_that!(cache.tool().num_calls(), eq(1));
    let built = results
        .into_iter()
        .map(|result| result.map(|cached| cached.transition))
        .collect::<crate::Result<Vec<_>>>()?
        .into_iter()
        .filter(|transition| *transition == CacheTransition::Built)
        .count();
    expect_that!(built, eq(1));
    expect_that!(cache.num_locks(), eq(0));
    Ok(())
}

#[gtest]
fn test_lock_table_is_emptied_after_each_resolve() -> Result<()> {
    let tempdir = tempfile::tempdir()?;
    let cache = DescriptorCache::new(FakeTool::compiling(NODEMAP_XML));

    for i in 0..3 {
        let source =
            testutils::write_fixture(tempdir.path(), &format!("graph{i}.tor"), "graph")?;
        cache.resolve(&source)?;
        cache.resolve(&source)?;
    }

    expect_that!(cache.tool().num_calls(), eq(3));
    expect_that!(cache.num_locks(), eq(0));
    Ok(())
}

#[gtest]
fn test_failed_resolve_releases_lock() -> Result<()> {
    let tempdir = tempfile::tempdir()?;
    let source = setup(tempdir.path())?;
    let cache = DescriptorCache::new(FakeTool::failing(2, "bad graph"));

    expect_that!(cache.resolve(&source).is_err(), eq(true));
    expect_that!(cache.num_locks(), eq(0));
    Ok(())
}

#[gtest]
fn test_record_persists_across_instances() -> Result<()> {
    let tempdir = tempfile::tempdir()?;
    let source = setup(tempdir.path())?;
    DescriptorCache::new(FakeTool::compiling(NODEMAP_XML)).resolve(&source)?;

    let cache = DescriptorCache::new(FakeTool::compiling(NODEMAP_XML));
    let cached = cache.resolve(&source)?;

    expect_that!(cache.tool().num_calls(), eq(0));
    expect_that!(cached.transition, eq(CacheTransition::Reused));
    Ok(())
}

#[gtest]
fn test_corrupt_record_is_unbuilt() -> Result<()> {
    let tempdir = tempfile::tempdir()?;
    let source = setup(tempdir.path())?;
    testutils::write_fixture(tempdir.path(), "terrain.xml", NODEMAP_XML)?;
    testutils::write_fixture(tempdir.path(), "terrain.cache.json", "{not json")?;
    let cache = DescriptorCache::new(FakeTool::compiling(NODEMAP_XML));

    expect_that!(cache.state(&source)?, eq(CacheState::Unbuilt));
    expect_that!(cache.resolve(&source)?.transition, eq(CacheTransition::Built));
    Ok(())
}

#[gtest]
fn test_record_wire_shape() -> Result<()> {
    let tempdir = tempfile::tempdir()?;
    let source = setup(tempdir.path())?;
    let cached = DescriptorCache::new(FakeTool::compiling(NODEMAP_XML)).resolve(&source)?;

    let record: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(
        DescriptorCache::<FakeTool>::record_path(&cached.source_path),
    )?)?;

    expect_that!(record["version"], eq(&serde_json::json!("1")));
    expect_that!(
        record["sourceHash"],
        eq(&serde_json::json!(cached.digest.to_hex()))
    );
    expect_that!(
        record["derivedPath"],
        eq(&serde_json::json!(cached.descriptor_path))
    );
    Ok(())
}
