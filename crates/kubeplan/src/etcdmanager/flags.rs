//! Agent flag encoding
//!
//! The etcd-manager agent is configured entirely through command-line
//! flags. The encoder emits `--flag=value` tokens, one per value for
//! repeatable flags, sorted lexicographically: the flag list ends up in a
//! manifest the executor diffs byte for byte, so ordering must never
//! depend on construction order.

/// Flag-encoded configuration for one etcd-manager agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagerConfig {
    /// Log verbosity, `--v`
    pub log_level: u32,

    /// Running inside a container, `--containerized`
    pub containerized: bool,

    /// PKI key directory, `--pki-dir`
    pub pki_dir: Option<String>,

    /// Disable TLS for manager-to-manager traffic, `--insecure`
    pub insecure: bool,

    /// Disable TLS for etcd itself, `--etcd-insecure`
    pub etcd_insecure: bool,

    /// Listen address override, `--address`
    pub address: Option<String>,

    pub peer_urls: String,
    pub grpc_port: u16,
    pub client_urls: String,
    pub discovery_poll_interval: Option<String>,
    pub quarantine_client_urls: String,
    pub cluster_name: String,
    pub backup_store: String,
    pub data_dir: Option<String>,
    pub volume_provider: String,
    /// Repeatable, one `--volume-tag` per entry
    pub volume_tags: Vec<String>,
    pub volume_name_tag: String,
    pub dns_suffix: String,
}

impl ManagerConfig {
    /// Encode as a sorted `--flag=value` token list.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--v={}", self.log_level),
            format!("--containerized={}", self.containerized),
            format!("--insecure={}", self.insecure),
            format!("--etcd-insecure={}", self.etcd_insecure),
            format!("--peer-urls={}", self.peer_urls),
            format!("--grpc-port={}", self.grpc_port),
            format!("--client-urls={}", self.client_urls),
            format!("--quarantine-client-urls={}", self.quarantine_client_urls),
            format!("--cluster-name={}", self.cluster_name),
            format!("--backup-store={}", self.backup_store),
            format!("--volume-provider={}", self.volume_provider),
            format!("--volume-name-tag={}", self.volume_name_tag),
            format!("--dns-suffix={}", self.dns_suffix),
        ];
        if let Some(pki_dir) = &self.pki_dir {
            args.push(format!("--pki-dir={pki_dir}"));
        }
        if let Some(address) = &self.address {
            args.push(format!("--address={address}"));
        }
        if let Some(interval) = &self.discovery_poll_interval {
            args.push(format!("--discovery-poll-interval={interval}"));
        }
        if let Some(data_dir) = &self.data_dir {
            args.push(format!("--data-dir={data_dir}"));
        }
        for tag in &self.volume_tags {
            args.push(format!("--volume-tag={tag}"));
        }
        args.sort();
        args
    }
}

/// Wrap a command so its output is also teed to a log file on the host.
///
/// The fifo indirection keeps the agent as pid 1 (via exec) while a
/// backgrounded `tee` copies combined stdout/stderr into the log.
pub fn with_tee(cmd: &str, args: &[String], log_file: &str) -> Vec<String> {
    let joined = args.join(" ");
    vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        format!(
            "mkfifo /tmp/pipe; (tee -a {log_file} < /tmp/pipe & ) ; exec {cmd} {joined} > /tmp/pipe 2>&1"
        ),
    ]
}
