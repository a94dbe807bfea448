#![allow(dead_code)]

use autovalue::application::ml::trainer::{ForestParameters, TrainingOptions};
use autovalue::domain::vehicle::RawVehicleRecord;

const MAKES: [(&str, f64, f64); 4] = [
    ("Ford", 0.0, 180.0),
    ("Honda", 500.0, 160.0),
    ("Toyota", 1000.0, 170.0),
    ("BMW", 1500.0, 250.0),
];

const BODIES: [(&str, f64); 3] = [("Sedan", 0.0), ("SUV / Crossover", 800.0), ("Pickup Truck", 1600.0)];

/// Deterministic listings whose price falls with age and mileage, with small
/// make and body premiums. All listed during 2021.
pub fn reference_listings(n: usize) -> Vec<RawVehicleRecord> {
    (0..n)
        .map(|i| {
            let year = 2008 + ((i * 7) % 15) as i32;
            let age = f64::from(2021 - year);
            let mileage = 9000.0 * age + 3000.0 + ((i * 37) % 50) as f64 * 100.0;
            let (make, make_premium, horsepower) = MAKES[i % 4];
            let (body, body_premium) = BODIES[(i / 4) % 3];
            let price = 32000.0 - 1800.0 * age - 0.05 * mileage + make_premium + body_premium;

            RawVehicleRecord {
                year: Some(year),
                mileage: Some(mileage),
                horsepower: Some(horsepower),
                owner_count: Some(1.0 + (age / 4.0).floor()),
                listed_date: Some(format!("{:02}/{:02}/2021", 1 + i % 12, 1 + i % 28)),
                make_name: Some(make.to_string()),
                body_type: Some(body.to_string()),
                dealer_zip: Some(format!("{}", 10001 + (i % 5) * 20000)),
                has_accidents: Some(if i % 10 == 0 { "TRUE" } else { "FALSE" }.to_string()),
                price: Some(price),
                ..Default::default()
            }
        })
        .collect()
}

/// Sedan / SUV / truck, newest and least driven first.
pub fn three_row_listings() -> Vec<RawVehicleRecord> {
    [
        (2020, "Sedan", 30000.0, 20000.0),
        (2018, "SUV / Crossover", 60000.0, 18000.0),
        (2015, "Pickup Truck", 100000.0, 15000.0),
    ]
    .into_iter()
    .map(|(year, body, mileage, price)| RawVehicleRecord {
        year: Some(year),
        mileage: Some(mileage),
        body_type: Some(body.to_string()),
        listed_date: Some("06/01/2021".to_string()),
        price: Some(price),
        ..Default::default()
    })
    .collect()
}

/// Default hyperparameters with fewer trees, for tests that do not measure
/// model quality.
pub fn quick_options() -> TrainingOptions {
    TrainingOptions {
        forest: ForestParameters {
            n_trees: 20,
            ..ForestParameters::default()
        },
        ..TrainingOptions::default()
    }
}

pub fn sample_vehicle() -> RawVehicleRecord {
    RawVehicleRecord {
        year: Some(2017),
        mileage: Some(52000.0),
        horsepower: Some(170.0),
        make_name: Some("Toyota".to_string()),
        body_type: Some("Sedan".to_string()),
        dealer_zip: Some("30001".to_string()),
        owner_count: Some(1.0),
        ..Default::default()
    }
}
