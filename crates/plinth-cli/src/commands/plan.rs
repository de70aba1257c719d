use std::path::Path;

use serde_json::json;

use plinth_core::PlinthConfig;
use plinth_stack::StackPlan;

pub fn plan(config_path: &str, format: &str) -> anyhow::Result<()> {
    let config = PlinthConfig::from_file(Path::new(config_path))?;
    let plan = StackPlan::from_config(&config)?;
    let order = plan.execution_order()?;

    match format {
        "json" => {
            let steps: Vec<_> = order
                .iter()
                .map(|id| {
                    let node = plan.graph.get(id);
                    json!({
                        "id": id,
                        "kind": node.map(|n| n.kind),
                        "depends_on": node.map(|n| n.depends_on.clone()),
                        "spec": plan.spec(id),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "steps": steps }))?);
        }
        _ => {
            println!("Creation order for stack {:?} ({} resources):", config.stack.name, order.len());
            for (i, id) in order.iter().enumerate() {
                let deps = plan
                    .graph
                    .get(id)
                    .map(|n| n.depends_on.join(", "))
                    .unwrap_or_default();
                if deps.is_empty() {
                    println!("  {:>2}. {id}", i + 1);
                } else {
                    println!("  {:>2}. {id}  (after: {deps})", i + 1);
                }
            }
            if config.network_policy().is_public() {
                println!();
                println!("⚠ database network policy is public-open (0.0.0.0/0) — demo environments only");
            }
        }
    }

    Ok(())
}
