use std::collections::HashMap;

use sweep_core::SWEEP_MANIFEST_FILE;

const DESIGN: &str = r#"
[defaults]
parking-permit-costs = 0
amount-of-shared-cars = 8
remove-spots-percentage = 0
days-in-month = 31
months-in-year = 12

[sweep]
names = ["8-sc-default", "32-sc-22-pp-20p-removed", "128-sc-93-pp-40p-removed"]

[sweep.values]
parking-permit-costs = [0, 22, 93]
amount-of-shared-cars = [8, 32, 128]
remove-spots-percentage = [0, 20, 40]
"#;

const SENSITIVITY: &str = r#"
[[entry]]
variable = "mean-value-of-time"
low = 8.75
high = 13.75

[[entry]]
variable = "amount-of-shared-cars"
low = 5
high = 50

[[entry]]
variable = "mean-public-transport-speed"
low = 25.0
high = 35.0
"#;

pub fn commented() -> HashMap<&'static str, String> {
    let mut map = HashMap::new();
    map.insert(
        SWEEP_MANIFEST_FILE,
        r#"# path to the simulation model, relative to this file
model = "model.nlogo"

# reporters sampled after every tick, one column per reporter
# and replication in the resulting table
reporters = [
    "monthly-car-trips",
    "monthly-shared-car-trips",
    "monthly-bike-trips",
    "monthly-public-transport-trips",
    "count cars",
    "shared-car-subscriptions",
    "public-transport-subscriptions",
]

# independent runs of each parameter set
replications = 3
# ticks sampled per run
ticks = 6

# experiment design with defaults and swept variables
design = "design.toml"
# low and high bounds for one-variable sensitivity runs
sensitivity = "sensitivity.toml"

# artifacts go to <output>/experiments and <output>/sensitivity
output = "results"
compress = true

# optional, checked before anything is sent to the simulation
[schema]
reporters = [
    "monthly-car-trips",
    "monthly-shared-car-trips",
    "monthly-bike-trips",
    "monthly-public-transport-trips",
    "count cars",
    "shared-car-subscriptions",
    "public-transport-subscriptions",
    "mean-car-preference",
]

[schema.parameters]
parking-permit-costs = { type = "int", min = 0 }
amount-of-shared-cars = { type = "int", min = 0 }
remove-spots-percentage = { type = "int", min = 0, max = 100 }
mean-value-of-time = { type = "float", min = 0 }
mean-public-transport-speed = { type = "float", min = 0 }
days-in-month = { type = "int", min = 28, max = 31 }
months-in-year = { type = "int" }
"#
        .to_string(),
    );
    map.insert("design.toml", DESIGN.to_string());
    map.insert("sensitivity.toml", SENSITIVITY.to_string());
    map
}

pub fn minimal() -> HashMap<&'static str, String> {
    let mut map = HashMap::new();
    map.insert(
        SWEEP_MANIFEST_FILE,
        r#"model = "model.nlogo"
reporters = ["count cars"]
replications = 3
ticks = 6
design = "design.toml"
sensitivity = "sensitivity.toml"
output = "results"
"#
        .to_string(),
    );
    map.insert("design.toml", DESIGN.to_string());
    map.insert("sensitivity.toml", SENSITIVITY.to_string());
    map
}
