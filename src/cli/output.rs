use crate::types::BuildResult;

/// Print the captured log of every failed build unit.
pub fn print_failed_results(results: &[BuildResult]) {
    for result in results.iter().filter(|r| !r.succeeded) {
        eprintln!();
        eprintln!("🚫 {} failed:", result.unit);
        eprintln!("{}", result.output_log.trim_end());
    }
}

pub fn print_results_json(results: &[BuildResult]) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(results)?);
    Ok(())
}

pub fn print_build_summary(results: &[BuildResult]) {
    let failed = results.iter().filter(|r| !r.succeeded).count();
    println!();
    println!("📦 Build Summary:");
    for result in results {
        println!(
            "  {} {}",
            if result.succeeded { "✅" } else { "❌" },
            result.unit
        );
    }
    if failed > 0 {
        println!("  {failed} of {} build unit(s) failed", results.len());
    }
}
