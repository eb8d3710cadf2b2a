//! Building, reading and verifying `.sdkk` packages
//!
//! This module provides:
//! - `build_package`: lay out, hash and checksum a package from host files
//! - `PackageReader`: decode, verify and extract an existing package

mod builder;
mod reader;

pub use builder::{
    build_package, build_package_with_plan, header_field_warnings, plan_layout, LayoutPlan, PackageFile, PackageSpec, PackageSummary,
    PlannedModule,
};
pub use reader::{PackageReader, VerifyProblem, VerifyReport};

/// Normalize an internal path: forward slashes, no leading `./` or `/`
pub fn normalize_internal_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let mut rest = unified.as_str();
    loop {
        if let Some(r) = rest.strip_prefix("./") {
            rest = r;
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
        } else {
            break;
        }
    }
    rest.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_internal_path() {
        assert_eq!(normalize_internal_path("res\\logo.bmp"), "res/logo.bmp");
        assert_eq!(normalize_internal_path("./bin/app.bin"), "bin/app.bin");
        assert_eq!(normalize_internal_path("/abs/file"), "abs/file");
        assert_eq!(normalize_internal_path("  plain  "), "plain");
    }
}
