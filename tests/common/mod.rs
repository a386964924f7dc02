//! Shared test utilities for integration and E2E tests.
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_compose(compose::SHARED_HOST);
//!     fixture.command().arg("extract").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::compose;
    pub use super::TestFixture;
}

/// Compose manifests used across tests.
#[allow(dead_code)]
pub mod compose {
    /// Two services agreeing on one variable.
    pub const SHARED_HOST: &str = "\
services:
  api:
    image: example/api
    environment:
      - DB_HOST=db1
  worker:
    image: example/worker
    environment:
      - DB_HOST=db1
";

    /// Two services disagreeing on `PORT`.
    pub const CONFLICT: &str = "\
services:
  api:
    environment:
      - PORT=8080
  worker:
    environment:
      - PORT=9090
";

    /// One service referencing a dot-file variable.
    pub const REFERENCE: &str = "\
services:
  x:
    environment:
      - FOO=${FOO}
";

    /// A service with comments and quoting to preserve.
    pub const COMMENTED: &str = "\
# project services
services:
  api:
    image: example/api  # pinned later
    environment:
      - DB_HOST=db1  # primary database
      - \"PORT=8080\"
";
}

/// Temporary directory with compose manifests and dot-files.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add `compose.yaml` with the given content.
    pub fn with_compose(self, content: &str) -> Self {
        self.with_file("compose.yaml", content)
    }

    /// Add `.env` with the given content.
    pub fn with_env(self, content: &str) -> Self {
        self.with_file(".env", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn file_path(&self, path: &str) -> PathBuf {
        self.temp_dir.path().join(path)
    }

    /// Content of a file in the fixture.
    pub fn read(&self, path: &str) -> String {
        fs::read_to_string(self.file_path(path)).expect("Failed to read file")
    }

    pub fn exists(&self, path: &str) -> bool {
        self.file_path(path).exists()
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A command for the binary, run from the fixture with colour off.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("extract-env");
        cmd.current_dir(self.path())
            .env_remove("RUST_LOG")
            .env_remove("EXTRACT_ENV_PREFIX")
            .env_remove("EXTRACT_ENV_POSTFIX")
            .arg("--color")
            .arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
