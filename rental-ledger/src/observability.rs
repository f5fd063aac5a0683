use tracing_subscriber::EnvFilter;

/// Library and binary targets shown at `info` when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "rental_ledger=info,export_ledger=info,import_ledger=info";

/// Install the fmt subscriber for the ledger binaries.
///
/// A valid `RUST_LOG` replaces the default directives. A second call (or a host
/// that already installed a subscriber) is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn default_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_DIRECTIVES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_names_ledger_targets() {
        let rendered = default_filter().to_string();
        for target in ["rental_ledger=info", "export_ledger=info", "import_ledger=info"] {
            assert!(rendered.contains(target), "{rendered}");
        }
    }
}
