//! Integration tests for CLI commands
//!
//! Nothing here reaches a real control plane: remote commands either fail
//! validation first or point at a closed local port.

use serde_json::json;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const PROJECT: &str = "5f1b2c3d4e5f6a7b8c9d0e1f";

const DOCUMENT: &str = r#"
projectId: 5f1b2c3d4e5f6a7b8c9d0e1f
name: orders
clusterType: REPLICASET
diskSizeGB: 40
replicationSpecs:
  - zoneName: Zone 1
    regionConfigs:
      - providerName: AWS
        regionName: US_EAST_1
        priority: 7
        electableSpecs:
          instanceSize: M10
          nodeCount: 3
"#;

/// Isolated home for one test: state dir, config dir, and the cluster document
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("cluster.yaml"), DOCUMENT).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn document(&self) -> String {
        self.path().join("cluster.yaml").display().to_string()
    }

    fn clusterform(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_clusterform"))
            .args(args)
            .env("CLUSTERFORM_STATE_DIR", self.path().join("state"))
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env("CLUSTERFORM_BASE_URL", closed_port_url())
            .env_remove("CLUSTERFORM_PUBLIC_KEY")
            .env_remove("CLUSTERFORM_PRIVATE_KEY")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute clusterform")
    }

    fn state_file(&self) -> std::path::PathBuf {
        self.path().join("state").join(PROJECT).join("orders.json")
    }
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port())
}

mod help {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        let output = Workspace::new().clusterform(&["--help"]);
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        for command in ["plan", "apply", "show", "destroy", "import"] {
            assert!(stdout.contains(command), "missing {command} in help");
        }
    }
}

mod plan_command {
    use super::*;

    #[test]
    fn test_plan_without_state_creates() {
        let ws = Workspace::new();
        let output = ws.clusterform(&["plan", "-f", &ws.document()]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("+ create cluster 'orders'"));
        assert!(stdout.contains("AWS US_EAST_1 M10 x3"));
    }

    #[test]
    fn test_plan_against_recorded_state() {
        let ws = Workspace::new();
        let dir = ws.path().join("state").join(PROJECT);
        fs::create_dir_all(&dir).unwrap();
        let spec = json!({
            "id": "6100c1f1e1a1b1c1d1e1f102",
            "zoneName": "Zone 1",
            "numShards": 1,
            "regionConfigs": [{
                "providerName": "AWS",
                "regionName": "US_EAST_1",
                "priority": 7,
                "electableSpecs": { "instanceSize": "M10", "nodeCount": 3 }
            }]
        });
        let record = json!({
            "config": {
                "projectId": PROJECT,
                "name": "orders",
                "clusterType": "REPLICASET",
                "diskSizeGB": 20.0,
                "replicationSpecs": [spec.clone()]
            },
            "state": {
                "projectId": PROJECT,
                "cluster": { "name": "orders", "stateName": "IDLE", "replicationSpecs": [spec] }
            },
            "appliedAt": "2026-01-05T09:30:00Z"
        });
        fs::write(dir.join("orders.json"), record.to_string()).unwrap();

        let output = ws.clusterform(&["plan", "-f", &ws.document()]);
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("last applied 2026-01-05 09:30:00"));
        assert!(stdout.contains("~ update cluster 'orders'"));
        assert!(stdout.contains("changed: diskSizeGB"));
        assert!(!stdout.contains("replicationSpecs"));
    }

    #[test]
    fn test_plan_rejects_invalid_document() {
        let ws = Workspace::new();
        let file = ws.path().join("empty.yaml");
        fs::write(&file, "projectId: 5f1b2c3d4e5f6a7b8c9d0e1f\nname: orders\n").unwrap();

        let output = ws.clusterform(&["plan", "-f", &file.display().to_string()]);
        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("replication spec"));
    }

    #[test]
    fn test_plan_missing_file_is_io_error() {
        let ws = Workspace::new();
        let output = ws.clusterform(&["plan", "-f", "does-not-exist.yaml"]);
        assert_eq!(output.status.code(), Some(5));
    }
}

mod remote_commands {
    use super::*;

    #[test]
    fn test_import_rejects_malformed_id() {
        let ws = Workspace::new();
        let output = ws.clusterform(&["import", "orders"]);

        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Import"));
    }

    #[test]
    fn test_apply_unreachable_control_plane() {
        let ws = Workspace::new();
        let output = ws.clusterform(&["apply", "-f", &ws.document()]);

        assert_eq!(output.status.code(), Some(3));
        assert!(!ws.state_file().exists());
    }

    #[test]
    fn test_show_unreachable_control_plane() {
        let ws = Workspace::new();
        let output = ws.clusterform(&["show", PROJECT, "orders"]);
        assert_eq!(output.status.code(), Some(3));
    }
}
