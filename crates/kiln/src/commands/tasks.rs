//! Task listing command.

use anyhow::Result;
use kiln_pipeline::{pipeline_graph, Entry};

/// Print every task with its prerequisites, then the entry points.
pub fn run() -> Result<()> {
    let graph = pipeline_graph()?;

    println!("Tasks:");
    for &name in graph.names() {
        let prerequisites: Vec<&str> = graph
            .prerequisites(name)
            .unwrap_or_default()
            .iter()
            .map(|p| p.name())
            .collect();

        if prerequisites.is_empty() {
            println!("  {:<14} {}", name.name(), name.description());
        } else {
            println!(
                "  {:<14} {} (after {})",
                name.name(),
                name.description(),
                prerequisites.join(", ")
            );
        }
    }

    println!("\nEntry points:");
    for entry in [Entry::Build, Entry::RunDev, Entry::RunProd] {
        let steps: Vec<&str> = entry.steps().iter().map(|s| s.name()).collect();
        println!("  {:<14} {}", entry.name(), steps.join(" -> "));
    }

    Ok(())
}
