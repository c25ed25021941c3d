//! A thin demo driver over [kdiag]: builds a small in-memory model, poses a conflict, and
//! prints whatever diagnoses the core finds.
//!
//! Not the REPL or GUI described alongside this crate's model — those are external UI
//! collaborators and stay out of scope; this binary exists only to exercise the public
//! `Session` API by hand.

use kdiag::config::Config;
use kdiag::fixture::FixtureModel;
use kdiag::model::{Model, ModelExpr, Property, Tristate};
use kdiag::session::Session;

fn main() {
    env_logger::init();

    // A tristate `DRIVER` feature a boolean `MODULE` depends on, S2-shaped.
    let mut model = FixtureModel::new();
    let driver = model.add_tri("DRIVER");
    let module = model.add_bool("MODULE");
    model.set_direct_dep(module, ModelExpr::Symbol(driver));
    model.add_property(driver, Property::Prompt { cond: ModelExpr::True });
    model.add_property(module, Property::Prompt { cond: ModelExpr::True });

    let mut session = Session::new(&model, Config::default()).expect("session construction");
    session
        .add_conflict(&model, module, Tristate::Yes)
        .expect("MODULE is a valid conflict target");

    println!("conflict: MODULE := yes (currently DRIVER=n, MODULE=n)");

    let report = session.run_diagnosis(&model).expect("diagnosis search");
    println!("status: {:?}", report.status);
    println!("{} diagnosis(es) found:", report.diagnoses.len());
    for (i, diagnosis) in report.diagnoses.iter().enumerate() {
        println!("  #{i}:");
        for fix in &diagnosis.fixes {
            println!("    {fix:?}");
        }
    }

    if let Some(first) = report.diagnoses.first() {
        let apply_report = session.apply(&mut model, first);
        println!(
            "applied {} fix(es), {} failed",
            apply_report.applied.len(),
            apply_report.failed.len()
        );
        println!("DRIVER is now {:?}", model.symbol(driver).current_value());
        println!("MODULE is now {:?}", model.symbol(module).current_value());
    }
}
