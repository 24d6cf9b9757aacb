//! CRD YAML Generator
//!
//! Prints the manifests for RemoteCluster, RemoteObject and
//! RemoteObjectPriorityClass.
//!
//! Usage: cargo run --bin crdgen > deploy/crds/all.yaml

use fleet_sync_operator::crd::generate_crds;

fn main() -> Result<(), serde_yaml::Error> {
    for crd in generate_crds()? {
        println!("---");
        print!("{}", crd);
    }
    Ok(())
}
