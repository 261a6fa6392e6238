//! Lexical path helpers.

/// Resolve `input` against `cwd` without touching the tree: collapses
/// repeated slashes, drops `.`, and pops on `..` (never above root).
pub fn normalize_path(cwd: &str, input: &str) -> String {
    let raw = if input.starts_with('/') {
        input.to_string()
    } else {
        join(cwd, input)
    };

    let mut parts: Vec<&str> = Vec::new();
    for component in raw.split('/') {
        match component {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Join a directory and a child path with exactly one separator.
pub fn join(dir: &str, child: &str) -> String {
    if child.is_empty() {
        return dir.to_string();
    }
    if dir.is_empty() {
        return child.to_string();
    }
    if dir.ends_with('/') {
        format!("{dir}{child}")
    } else {
        format!("{dir}/{child}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_input_ignores_cwd() {
        assert_eq!(normalize_path("/home", "/etc/hosts"), "/etc/hosts");
    }

    #[test]
    fn relative_input() {
        assert_eq!(normalize_path("/home", "user/file"), "/home/user/file");
        assert_eq!(normalize_path("/", "file"), "/file");
    }

    #[test]
    fn dot_and_dotdot() {
        assert_eq!(normalize_path("/a/b", "../c/./d"), "/a/c/d");
        assert_eq!(normalize_path("/", "../../.."), "/");
    }

    #[test]
    fn trailing_and_repeated_slashes() {
        assert_eq!(normalize_path("/", "//dir///file/"), "/dir/file");
    }

    #[test]
    fn join_separators() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
        assert_eq!(join("src", "main.rs"), "src/main.rs");
        assert_eq!(join("", "x"), "x");
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalize_is_idempotent(path in "[/a-z0-9_.]{1,50}") {
                let once = normalize_path("/", &path);
                let twice = normalize_path("/", &once);
                prop_assert_eq!(&once, &twice, "normalize must be idempotent");
            }

            #[test]
            fn normalize_never_has_double_slashes(path in "[/a-z0-9_.]{1,50}") {
                let normed = normalize_path("/cwd", &path);
                prop_assert!(!normed.contains("//"), "normalized path must not contain //: {normed}");
            }

            #[test]
            fn normalize_starts_with_slash(path in "[a-z0-9_./]{0,50}") {
                let normed = normalize_path("/", &path);
                prop_assert!(normed.starts_with('/'), "normalized path must start with /: {normed}");
            }

            #[test]
            fn normalize_no_dot_segments(path in "[/a-z.]{1,50}") {
                let normed = normalize_path("/x/y", &path);
                for seg in normed.split('/') {
                    prop_assert!(seg != "." && seg != "..", "dot segment left in {normed}");
                }
            }
        }
    }
}
