//! Prints the operator's CRD manifests as a multi-document YAML stream.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/bases/crds.yaml`

use crds::AutomotiveDevConfig;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [AutomotiveDevConfig::crd()];

    for crd in crds {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }

    Ok(())
}
