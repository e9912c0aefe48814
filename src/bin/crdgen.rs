//! Prints the Connector CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/connector.yaml
//! ```

use kube::CustomResourceExt;

use connector_operator::Connector;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&Connector::crd())?);
    Ok(())
}
