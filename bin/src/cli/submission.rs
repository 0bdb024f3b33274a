use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use engine::{RequestWorkspace, Submission};

/// Values and files submitted for the parameters of a source.
#[derive(Args, Debug)]
pub struct SubmissionArgs {
    /// JSON encoded value for a parameter, e.g. `--value 'size=[1, 2, 3]'`. May be repeated.
    #[arg(long = "value", value_name = "NAME=JSON", value_parser = parse_named::<String>)]
    values: Vec<(String, String)>,

    /// File for a file parameter. It is copied into the request workspace first. May be
    /// repeated.
    #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_named::<PathBuf>)]
    files: Vec<(String, PathBuf)>,
}

impl SubmissionArgs {
    /// Builds the submission, staging its files into `workspace`.
    pub fn stage(&self, workspace: &RequestWorkspace) -> Result<Submission> {
        let mut submission = Submission::new();
        for (name, json) in &self.values {
            if submission.values.insert(name.clone(), json.clone()).is_some() {
                log::warn!("Value for {name:?} given more than once, using the last.");
            }
        }
        for (name, path) in &self.files {
            let staged = workspace
                .stage_file(name, path)
                .with_context(|| format!("staging file {:?} for {name:?}", path))?;
            if submission.files.insert(name.clone(), staged).is_some() {
                log::warn!("File for {name:?} given more than once, using the last.");
            }
        }
        Ok(submission)
    }
}

/// Parses a `NAME=VALUE` argument.
fn parse_named<T>(arg: &str) -> std::result::Result<(String, T), String>
where
    T: From<String>,
{
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_owned(), T::from(value.to_owned()))),
        Some(_) => Err(format!("missing parameter name in {arg:?}")),
        None => Err(format!("expected NAME=VALUE, got {arg:?}")),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use googletest::prelude::*;
    use test_casing::test_casing;

    use super::*;
    use engine::RequestIdentity;

    #[gtest]
    fn test_parse_named_splits_at_first_equals() {
        expect_that!(
            parse_named::<String>("expr=\"a=b\""),
            eq(&Ok(("expr".to_owned(), "\"a=b\"".to_owned())))
        );
        expect_that!(
            parse_named::<String>("empty="),
            eq(&Ok(("empty".to_owned(), String::new())))
        );
    }

    #[test_casing(3, ["seed", "=3", ""])]
    fn test_parse_named_rejects(arg: &str) {
        assert_that!(parse_named::<PathBuf>(arg).is_err(), eq(true));
    }

    #[gtest]
    fn test_stage_copies_files_into_workspace() -> Result<()> {
        let tempdir = tempfile::tempdir()?;
        let mask = testutils::write_fixture(tempdir.path(), "mask.png", "mask")?;
        let workspace = RequestWorkspace::create(
            &tempdir.path().join("work"),
            &RequestIdentity::new("cli", "terrain.tor"),
        )?;
        let args = SubmissionArgs {
            values: vec![
                ("seed".into(), "1".into()),
                ("seed".into(), "2".into()),
            ],
            files: vec![("mask".into(), mask)],
        };

        let submission = args.stage(&workspace)?;

        expect_that!(submission.values.get("seed"), some(eq("2")));
        expect_that!(
            submission.files.get("mask"),
            some(eq(&workspace.uploads_dir().join("mask/mask.png")))
        );
        Ok(())
    }

    #[gtest]
    fn test_stage_missing_file_is_error() -> Result<()> {
        let tempdir = tempfile::tempdir()?;
        let workspace =
            RequestWorkspace::create(tempdir.path(), &RequestIdentity::new("cli", "terrain.tor"))?;
        let args = SubmissionArgs {
            values: vec![],
            files: vec![("mask".into(), tempdir.path().join("absent.png"))],
        };

        let err = args.stage(&workspace).unwrap_err();

        expect_that!(format!("{err:#}"), contains_substring("absent.png"));
        Ok(())
    }
}
