use std::io::Write;
use std::path::Path;

use strand_core::config::{AppConfig, GraphOptions};
use strand_core::error::StrandError;
use strand_graph::GraphDefinition;

fn write_tmp(content: &str) -> tempfile::NamedTempFile {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(content.as_bytes()).expect("write toml");
    tmp
}

#[tokio::test]
async fn test_demo_review_graph_runs() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/review.toml");
    let graph = GraphDefinition::load(&path)
        .expect("load demo")
        .build(GraphOptions::default())
        .expect("build demo");

    assert_eq!(graph.start_node(), "writer");
    assert_eq!(graph.options().max_iterations, 8);

    let result = graph.run("graph orchestration").await.expect("run demo");
    assert_eq!(result.path, vec!["writer", "reviewer", "reviser", "reviewer"]);
    assert_eq!(result.final_output, "APPROVED: ready to publish");
    assert_eq!(result.visits("reviewer").len(), 2);
}

#[test]
fn test_demo_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/strand.toml");
    let config = AppConfig::load(&path).expect("load config");
    assert_eq!(config.run.options.max_iterations, 10);
    assert!(config.run.timeout_secs.is_none());
}

#[test]
fn test_config_options_apply_to_definitions_without_options() {
    let config_file = write_tmp(
        r#"
[run]
max_iterations = 2
"#,
    );
    let graph_file = write_tmp(
        r#"
name = "spin"

[[nodes]]
name = "entry"
step = { kind = "echo" }

[[nodes]]
name = "spin"
step = { kind = "echo" }

[[edges]]
from = "entry"
to = "spin"

[[edges]]
from = "spin"
to = "spin"
when = 'contains "x"'
"#,
    );

    let config = AppConfig::load(config_file.path()).expect("load config");
    let graph = GraphDefinition::load(graph_file.path())
        .expect("load graph")
        .build(config.run.options)
        .expect("build graph");
    assert_eq!(graph.options().max_iterations, 2);
}

#[test]
fn test_env_var_expansion_in_definition() {
    std::env::set_var("STRAND_TEST_REPLY", "expanded reply");

    let graph_file = write_tmp(
        r#"
name = "env"

[[nodes]]
name = "only"
step = { kind = "scripted", responses = ["${STRAND_TEST_REPLY}"] }
"#,
    );

    let def = GraphDefinition::load(graph_file.path()).expect("load graph");
    match &def.nodes[0].step {
        strand_graph::StepDefinition::Scripted { responses, .. } => {
            assert_eq!(responses, &vec!["expanded reply".to_string()]);
        }
        other => panic!("unexpected step: {other:?}"),
    }

    std::env::remove_var("STRAND_TEST_REPLY");
}

#[test]
fn test_definition_build_errors_surface() {
    let graph_file = write_tmp(
        r#"
name = "dup"

[[nodes]]
name = "a"
step = { kind = "echo" }

[[nodes]]
name = "a"
step = { kind = "echo" }
"#,
    );

    let err = GraphDefinition::load(graph_file.path())
        .expect("load graph")
        .build(GraphOptions::default())
        .unwrap_err();
    assert!(matches!(err, StrandError::DuplicateNode(ref n) if n == "a"));
}

#[test]
fn test_missing_definition_file() {
    let err = GraphDefinition::load(Path::new("/nonexistent/graph.toml")).unwrap_err();
    assert!(matches!(err, StrandError::ConfigNotFound(_)));
}
