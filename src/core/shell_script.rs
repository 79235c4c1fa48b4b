//! A POSIX shell rendition of the aggregation, for running on another machine.
//!
//! The script defines three helpers and then runs one command per root:
//!
//! - `ctx_emit FILE` writes one block, skipping non-files and files already
//!   written (compared by `realpath`), with an error block for unreadable files.
//! - `ctx_walk DIR` lists one directory level at a time: subdirectories first
//!   (recursing), then files, each group ordered by lowercased name with the raw
//!   name as tie-breaker.
//! - `ctx_sort` implements that ordering on top of `awk` and `LC_ALL=C sort`.
//!
//! Hidden names, ignored directory names, ignored extensions and exclusions are
//! applied with `find` predicates. Glob ignore patterns have no `find`
//! equivalent and are not carried over; the script says so in a comment.

use std::io;
use std::path::{Path, MAIN_SEPARATOR};

use super::aggregator::{separator_line, FILE_MARKER};
use super::exclusions::ExclusionSet;
use super::ignore::IgnoreRules;

const EACCES: i32 = 13;

/// Quotes `value` for a POSIX shell: single quotes, with embedded single
/// quotes closed, escaped and reopened.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Escapes the characters `find -name`/`-path` treat as pattern syntax.
fn find_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '*' | '?' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds the script that writes the same blocks as
/// [`ContentAggregator::generate`](super::aggregator::ContentAggregator::generate)
/// into `output_file`.
///
/// The first root truncates the output; every later root appends. Commands are
/// chained with `&&`. An empty selection yields an empty string.
pub fn shell_script<P: AsRef<Path>>(
    roots: &[P],
    output_file: &Path,
    exclusions: &ExclusionSet,
    rules: &IgnoreRules,
) -> String {
    let output = shell_quote(&output_file.to_string_lossy());

    let mut commands = vec![String::from("ctx_seen=$(mktemp)")];
    for root in roots {
        let root = root.as_ref();
        if exclusions.is_excluded(root) {
            continue;
        }
        let redirect = if commands.len() == 1 { ">" } else { ">>" };
        let helper = if root.is_dir() { "ctx_walk" } else { "ctx_emit" };
        commands.push(format!(
            "{helper} {} {redirect} {output}",
            shell_quote(&trimmed(root))
        ));
    }
    if commands.len() == 1 {
        return String::new();
    }
    commands.push(String::from("rm -f \"$ctx_seen\""));

    let mut script = String::new();
    if rules.has_patterns() {
        script.push_str("# Glob ignore patterns from the configuration are not applied here.\n");
    }
    script.push_str(&emit_function());
    script.push_str(SORT_FUNCTION);
    script.push_str(&walk_function(exclusions, rules));
    script.push_str(&commands.join(" &&\n"));
    script
}

/// Root path without trailing separators, so `find` prints the same paths the
/// in-process walk produces.
fn trimmed(root: &Path) -> String {
    let root = root.to_string_lossy();
    let stripped = root.trim_end_matches(MAIN_SEPARATOR);
    if stripped.is_empty() {
        root.into_owned()
    } else {
        stripped.to_string()
    }
}

fn emit_function() -> String {
    let separator = shell_quote(&separator_line());
    let unreadable = shell_quote(&format!(
        "[ERROR: {}]",
        io::Error::from_raw_os_error(EACCES)
    ));
    format!(
        "ctx_emit() {{\n  \
           [ -f \"$1\" ] || return 0\n  \
           ctx_id=$(realpath \"$1\" 2>/dev/null) || ctx_id=$1\n  \
           if grep -Fxq -e \"$ctx_id\" \"$ctx_seen\"; then return 0; fi\n  \
           printf '%s\\n' \"$ctx_id\" >> \"$ctx_seen\"\n  \
           if [ -r \"$1\" ]; then\n    \
             printf '%s\\n' \"{FILE_MARKER} $1\" {separator}\n    \
             cat \"$1\"\n    \
             printf '\\n\\n'\n  \
           else\n    \
             printf '%s\\n%s\\n\\n' \"{FILE_MARKER} $1\" {unreadable}\n  \
           fi\n\
         }}\n"
    )
}

const SORT_FUNCTION: &str = "ctx_sort() {\n  \
    awk '{ print tolower($0) \"\\t\" $0 }' | LC_ALL=C sort | cut -f 2-\n\
    }\n";

fn walk_function(exclusions: &ExclusionSet, rules: &IgnoreRules) -> String {
    let excluded: String = exclusions
        .iter()
        .map(|entry| format!(" ! -path {}", shell_quote(&find_literal(entry))))
        .collect();

    let dir_names = rules.dir_names();
    let skip_dirs = if dir_names.is_empty() {
        String::new()
    } else {
        let names: Vec<String> = dir_names
            .iter()
            .map(|name| format!("-name {}", shell_quote(&find_literal(name))))
            .collect();
        format!(" ! \\( {} \\)", names.join(" -o "))
    };
    let skip_extensions: String = rules
        .extensions()
        .iter()
        .map(|ext| format!(" ! -iname {}", shell_quote(&format!("*{}", find_literal(ext)))))
        .collect();

    format!(
        "ctx_walk() {{\n  \
           find \"$1\" -mindepth 1 -maxdepth 1 -type d ! -name '.*'{skip_dirs}{excluded} -print 2>/dev/null | ctx_sort |\n    \
             while IFS= read -r d; do ctx_walk \"$d\"; done\n  \
           find \"$1\" -mindepth 1 -maxdepth 1 ! -type d ! -name '.*'{skip_extensions}{excluded} -print 2>/dev/null | ctx_sort |\n    \
             while IFS= read -r f; do ctx_emit \"$f\"; done\n\
         }}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContentAggregator;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn commands_of(script: &str) -> Vec<&str> {
        script
            .lines()
            .skip_while(|line| !line.starts_with("ctx_seen="))
            .collect()
    }

    #[test]
    fn test_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_find_literal_escapes_pattern_syntax() {
        assert_eq!(find_literal("/p/a[1]*?.txt"), r"/p/a\[1\]\*\?.txt");
        assert_eq!(find_literal("plain"), "plain");
    }

    #[test]
    fn test_empty_selection_yields_empty_script() {
        let roots: Vec<PathBuf> = Vec::new();
        let script = shell_script(
            &roots,
            Path::new("/tmp/out.txt"),
            &ExclusionSet::default(),
            &IgnoreRules::default(),
        );
        assert!(script.is_empty());
    }

    #[test]
    fn test_roots_truncate_then_append() {
        let roots = [
            PathBuf::from("/project/b.txt"),
            PathBuf::from("/project/notes/it's.md"),
        ];
        let script = shell_script(
            &roots,
            Path::new("/tmp/context.txt"),
            &ExclusionSet::default(),
            &IgnoreRules::default(),
        );

        insta::assert_snapshot!(commands_of(&script).join("\n"), @r#"
        ctx_seen=$(mktemp) &&
        ctx_emit '/project/b.txt' > '/tmp/context.txt' &&
        ctx_emit '/project/notes/it'\''s.md' >> '/tmp/context.txt' &&
        rm -f "$ctx_seen"
        "#);
    }

    #[test]
    fn test_excluded_root_is_skipped() {
        let roots = [PathBuf::from("/project/a.txt"), PathBuf::from("/project/b.txt")];
        let exclusions = ExclusionSet::from_paths(["/project/a.txt".to_string()]);

        let script = shell_script(
            &roots,
            Path::new("/tmp/out.txt"),
            &exclusions,
            &IgnoreRules::default(),
        );

        assert!(script.contains("ctx_emit '/project/b.txt' > '/tmp/out.txt'"));
        assert!(!script.contains("ctx_emit '/project/a.txt'"));
    }

    #[test]
    fn test_walk_carries_ignore_rules_and_exclusions() {
        let exclusions = ExclusionSet::from_paths(["/proj/secret[1]".to_string()]);
        let rules = IgnoreRules::new(["node_modules"], [".png"], &Default::default());

        let script = shell_script(&["/proj/file.txt"], Path::new("/tmp/out.txt"), &exclusions, &rules);

        assert!(script.contains("-type d ! -name '.*' ! \\( -name 'node_modules' \\) ! -path '/proj/secret\\[1\\]'"));
        assert!(script.contains("! -type d ! -name '.*' ! -iname '*.png' ! -path '/proj/secret\\[1\\]'"));
        assert!(!script.starts_with('#'));
    }

    #[test]
    fn test_glob_patterns_are_flagged() {
        let patterns = ["*.log".to_string()].into_iter().collect();
        let rules = IgnoreRules::new(["target"], [".png"], &patterns);

        let script = shell_script(&["/proj/a.txt"], Path::new("/tmp/out.txt"), &ExclusionSet::default(), &rules);

        assert!(script.starts_with("# Glob ignore patterns"));
    }

    #[cfg(unix)]
    mod execution {
        use super::*;
        use crate::utils::test_helpers::{running_as_root, write_file};
        use std::os::unix::fs::{symlink, PermissionsExt};
        use std::process::Command;

        /// Runs the script for `roots` and returns what it wrote.
        fn run_script(roots: &[PathBuf], exclusions: &ExclusionSet, rules: &IgnoreRules) -> String {
            let out_dir = tempdir().unwrap();
            let output = out_dir.path().join("out.txt");
            let script = shell_script(roots, &output, exclusions, rules);

            let status = Command::new("sh").arg("-c").arg(&script).status().unwrap();
            assert!(status.success(), "script failed:\n{script}");
            fs::read_to_string(&output).unwrap()
        }

        #[test]
        fn test_script_reproduces_generated_content() {
            let dir = tempdir().unwrap();
            let base = fs::canonicalize(dir.path()).unwrap();
            let root = base.join("proj");
            write_file(&root, "sub/z.txt", "z");
            write_file(&root, "Sub2/Inner/deep.rs", "fn deep() {}\n");
            write_file(&root, "a.txt", "alpha");
            write_file(&root, "a_x.txt", "underscore");
            write_file(&root, "ab.txt", "ab");
            write_file(&root, "Beta.md", "# beta\n");
            write_file(&root, "it's here.txt", "quote");
            write_file(&root, ".hidden", "hidden");
            write_file(&root, "logo.PNG", "png");
            write_file(&root, "node_modules/pkg/index.js", "module");
            write_file(&root, "secret/key.pem", "key");
            let target = write_file(&base, "outside/target.txt", "linked");
            symlink(&target, root.join("linked.txt")).unwrap();
            let other = write_file(&base, "other/b.txt", "bee");

            let exclusions =
                ExclusionSet::from_paths([root.join("secret").to_string_lossy().into_owned()]);
            let rules = IgnoreRules::default();
            // A file root after a directory root, plus a duplicate of a file
            // already covered by the directory.
            let roots = vec![root.clone(), other, root.join("a.txt")];

            let expected = ContentAggregator::generate(&roots, &exclusions, &rules).unwrap();
            let written = run_script(&roots, &exclusions, &rules);

            assert_eq!(written, expected.content);
            assert_eq!(
                expected.files.iter().filter(|f| f.ends_with("a.txt")).count(),
                1
            );
            assert!(expected.files.contains(&root.join("linked.txt")));
        }

        #[test]
        fn test_script_orders_names_like_the_walk() {
            let dir = tempdir().unwrap();
            let root = fs::canonicalize(dir.path()).unwrap();
            for name in ["ab.txt", "a_x.txt", "A[1].txt", "a^.txt", "B.txt", "a.txt"] {
                write_file(&root, name, name);
            }
            write_file(&root, "zz/inner.txt", "inner");
            let roots = vec![root];
            let rules = IgnoreRules::none();

            let expected =
                ContentAggregator::generate(&roots, &ExclusionSet::default(), &rules).unwrap();

            assert_eq!(run_script(&roots, &ExclusionSet::default(), &rules), expected.content);
        }

        #[test]
        fn test_script_writes_error_block_for_unreadable_file() {
            if running_as_root() {
                return;
            }
            let dir = tempdir().unwrap();
            let root = fs::canonicalize(dir.path()).unwrap();
            write_file(&root, "readable.txt", "ok");
            let locked = write_file(&root, "locked.txt", "secret");
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
            let roots = vec![root];
            let rules = IgnoreRules::default();

            let expected =
                ContentAggregator::generate(&roots, &ExclusionSet::default(), &rules).unwrap();
            let written = run_script(&roots, &ExclusionSet::default(), &rules);
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

            assert!(expected.content.contains("[ERROR: "));
            assert_eq!(written, expected.content);
        }
    }
}
