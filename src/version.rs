/// Package version plus the build commit, injected by `build.rs`.
pub const GIT_VERSION: &str = env!("GIT_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_starts_with_package_version() {
        if option_env!("TRAINLOG_VERSION").is_none() {
            assert!(GIT_VERSION.starts_with(env!("CARGO_PKG_VERSION")));
        }
    }
}
