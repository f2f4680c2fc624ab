//! Tests for the compiler module

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use rand::Rng;

    use super::super::structure::is_balanced;
    use super::super::subprocess::classify_diagnostics;
    use super::super::*;
    use crate::constants::INVALID_STRUCTURE;
    use crate::models::ArtifactRef;
    use crate::utils::hash::sha256_hex;

    /// Counts how often the backend is reached.
    #[derive(Default)]
    struct CountingCompiler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Compiler for CountingCompiler {
        fn describe(&self) -> CompilerInfo {
            CompilerInfo {
                path: PathBuf::from("counting-cc"),
                version: None,
            }
        }

        async fn compile_checked(&self, _source: &str) -> Result<CompilationOutcome, CompilerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompilationOutcome::succeeded(ArtifactRef::new("/tmp/c.o", "00"), Vec::new()))
        }
    }

    fn random_balanced(rng: &mut impl Rng, depth: usize) -> String {
        let mut out = String::new();
        for _ in 0..rng.gen_range(1..4) {
            if depth == 0 || rng.gen_bool(0.3) {
                out.push_str("x = 1;");
                continue;
            }
            let (open, close) = match rng.gen_range(0..3) {
                0 => ('{', '}'),
                1 => ('(', ')'),
                _ => ('[', ']'),
            };
            out.push(open);
            out.push_str(&random_balanced(rng, depth - 1));
            out.push(close);
        }
        out
    }

    #[test]
    fn test_balance_simple_cases() {
        assert!(is_balanced("int f(void) { int a[2]; return a[0]; }"));
        assert!(is_balanced(""));
        assert!(!is_balanced("int f(void) { return 0;"));
        assert!(!is_balanced("int f(void) return 0; }"));
        assert!(!is_balanced("int f(void { return 0; }"));
        assert!(!is_balanced("int a[2;"));
        assert!(!is_balanced("}{"));
    }

    #[test]
    fn test_balance_ignores_comments_and_literals() {
        assert!(is_balanced("// {\nint f(void) { return 0; }"));
        assert!(is_balanced("/* ( [ */ int f(void) { return 0; }"));
        assert!(is_balanced("int f(void) { puts(\"}\"); return '{'; }"));
        assert!(is_balanced("int f(void) { puts(\"\\\"}\"); return 0; }"));
        assert!(!is_balanced("/* } */ int f(void) { return 0;"));
    }

    #[test]
    fn test_balance_randomized() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let source = random_balanced(&mut rng, 4);
            assert!(is_balanced(&source), "{}", source);

            let positions: Vec<usize> = source
                .char_indices()
                .filter(|(_, c)| "{}()[]".contains(*c))
                .map(|(i, _)| i)
                .collect();
            if positions.is_empty() {
                continue;
            }
            let drop_at = positions[rng.gen_range(0..positions.len())];
            let mut broken = source.clone();
            broken.remove(drop_at);
            assert!(!is_balanced(&broken), "{}", broken);
        }
    }

    #[tokio::test]
    async fn test_gate_runs_before_backend() {
        let compiler = CountingCompiler::default();

        let outcome = compiler.compile("int f(void) { return 0;").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.errors, vec![INVALID_STRUCTURE.to_string()]);
        assert!(outcome.artifact.is_none());
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 0);

        let outcome = compiler.compile("int f(void) { return 0; }").await.unwrap();
        assert!(outcome.success);
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gate_never_spawns_missing_toolchain() {
        let compiler = SubprocessCompiler::new("/nonexistent/cc", Vec::new(), Duration::from_secs(5));
        let outcome = compiler.compile("int f(void) { return (0; }").await.unwrap();
        assert_eq!(outcome.errors, vec![INVALID_STRUCTURE.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_toolchain_is_compiler_error() {
        let compiler = SubprocessCompiler::new("/nonexistent/cc", Vec::new(), Duration::from_secs(5));
        let result = compiler.compile("int f(void) { return 0; }").await;
        assert!(matches!(result, Err(CompilerError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_mock_compiler() {
        let compiler = MockCompiler::new();

        let source = "#include <stdio.h>\nint memcpy(void) {\n    return 0;\n}\n";
        let outcome = compiler.compile(source).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.warnings, vec!["No main function found".to_string()]);
        let artifact = outcome.artifact.unwrap();
        assert_eq!(artifact.digest(), sha256_hex(source.as_bytes()));

        let outcome = compiler.compile("int f(void) { return 0; }").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.errors, vec!["Invalid C code structure".to_string()]);

        let info = compiler.describe();
        assert_eq!(info.version.as_deref(), Some("Mock Compiler v1.0.0"));
    }

    #[test]
    fn test_classify_diagnostics() {
        let stderr = "candidate.c:3:5: warning: unused variable 'x'\n\
                      candidate.c:4:1: error: expected ';' before '}' token\n\
                      \n\
                      1 error generated.\n\
                      note: some context\n";
        let (errors, warnings) = classify_diagnostics(stderr);
        assert_eq!(warnings, vec!["candidate.c:3:5: warning: unused variable 'x'".to_string()]);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("expected ';'"));
    }

    #[cfg(unix)]
    fn shell_compiler(script: &str) -> SubprocessCompiler {
        // argv after the script: $1=-c $2=<input> $3=-o $4=<output>
        SubprocessCompiler::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            Duration::from_secs(10),
        )
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_subprocess_success_keeps_workspace_until_drop() {
        let compiler = shell_compiler("echo 'warning: implicit int' >&2; cp \"$2\" \"$4\"");
        let source = "int f(void) { return 0; }\n";

        let outcome = compiler.compile(source).await.unwrap();
        assert!(outcome.success, "{:?}", outcome);
        assert_eq!(outcome.warnings, vec!["warning: implicit int".to_string()]);

        let artifact = outcome.artifact.clone().unwrap();
        assert_eq!(artifact.digest(), sha256_hex(source.as_bytes()));
        assert!(artifact.path().exists());

        let workspace = artifact.workspace().unwrap().to_path_buf();
        drop(artifact);
        assert!(workspace.exists(), "outcome still holds the workspace");
        drop(outcome);
        assert!(!workspace.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_subprocess_diagnostics_are_outcome_data() {
        let compiler = shell_compiler("echo \"$2:1:1: error: unknown type name 'u32'\" >&2; exit 1");
        let outcome = compiler.compile("u32 f(void) { return 0; }").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("unknown type name"));
        assert!(outcome.artifact.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_subprocess_version_queried_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("version-queries");
        let script = format!(
            "if [ \"$1\" = --version ]; then echo queried >> '{}'; echo 'shcc 1.2.3'; exit 0; fi; cp \"$2\" \"$4\"",
            log.display()
        );
        let compiler = shell_compiler(&script);
        assert_eq!(compiler.describe().version, None);

        compiler.compile("int f(void) { return 0; }").await.unwrap();
        compiler.compile("int g(void) { return 1; }").await.unwrap();

        assert_eq!(compiler.describe().version.as_deref(), Some("shcc 1.2.3"));
        assert_eq!(std::fs::read_to_string(&log).unwrap().lines().count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_subprocess_version_unknown_when_query_fails() {
        let compiler = shell_compiler("if [ \"$1\" = --version ]; then exit 2; fi; cp \"$2\" \"$4\"");
        assert_eq!(compiler.query_version().await.unwrap(), None);

        let outcome = compiler.compile("int f(void) { return 0; }").await.unwrap();
        assert!(outcome.success);
        assert_eq!(compiler.describe().version, None);
    }

    #[tokio::test]
    async fn test_version_query_missing_toolchain() {
        let compiler = SubprocessCompiler::new("/nonexistent/cc", Vec::new(), Duration::from_secs(5));
        assert!(matches!(compiler.query_version().await, Err(CompilerError::Unavailable(_))));
        assert_eq!(compiler.detect_version().await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_subprocess_timeout() {
        let compiler = SubprocessCompiler::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string(), "sh".to_string()],
            Duration::from_millis(100),
        );
        let result = compiler.compile("int f(void) { return 0; }").await;
        assert!(matches!(result, Err(CompilerError::Timeout(_))));
    }
}
