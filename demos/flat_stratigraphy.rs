//! Flat lying stratigraphy in a cube, from two values and one orientation.
//!
//! Writes the control data and the grid nodes to `out/` as text tables,
//! ready to be picked up by an external viewer.

extern crate nalgebra as na;

use stratiq::{io, ConstraintStore, GeologicalFeature, Grid, SolverConfig};

use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt::init();

  let out_path = "out";
  fs::create_dir_all(out_path)?;

  let grid = Grid::new(
    [20, 20, 20],
    na::Vector3::from_element(0.05),
    na::Point3::new(-0.5, -0.5, -0.5),
  )?;

  let mut constraints = ConstraintStore::new();
  constraints.add_point(na::Point3::new(0.0, 0.0, 0.0), 0.0)?;
  constraints.add_point(na::Point3::new(-0.5, 0.0, 0.0), 1.0)?;
  constraints.add_strike_and_dip(na::Point3::new(0.4, 0.0, 0.0), 70.0, 50.0)?;

  let config = SolverConfig::new("cg".parse()?, 6000.0);
  println!("Solving for {} node values...", grid.node_count());
  let feature = GeologicalFeature::build("stratigraphy", &grid, &constraints, &config)?;

  io::save_table(
    &feature.constraints().gradient_control(),
    format!("{out_path}/01_gradient.txt"),
  )?;
  io::save_table(
    &feature.constraints().control_points(),
    format!("{out_path}/01_value.txt"),
  )?;
  io::save_table(&grid.node_coords(), format!("{out_path}/01_box_coords.txt"))?;

  println!(
    "Feature `{}` ranges over [{:.4}, {:.4}].",
    feature.name(),
    feature.min(),
    feature.max()
  );
  for c in constraints.values() {
    println!(
      "value {:.3} observed, {:.3} modelled at {:?}",
      c.value,
      feature.evaluate_value(&c.position),
      c.position.coords.as_slice()
    );
  }
  for c in constraints.gradients() {
    let gradient = feature.evaluate_gradient(&c.position);
    let (strike, dip) = c.strike_dip()?;
    println!(
      "orientation {strike:.1}/{dip:.1} observed, gradient {:?} modelled",
      gradient.as_slice()
    );
  }
  println!("Evenly spaced isovalues: {:.4?}", feature.isovalues(5));
  Ok(())
}
