use crate::cli::CommonArgs;
use crate::model::{EquityEntry, EquityOutput, SCHEMA_VERSION};
use anyhow::Result;
use chrono::Utc;
use console::style;
use std::path::Path;

pub fn output_report(entries: &[EquityEntry]) -> Result<()> {
    println!("{}", style("Developers of this Repo:").bold());
    for entry in entries {
        let author = style(&entry.author).magenta();
        let share = style(format!("{:.2}%", entry.equity)).color256(equity_color(entry.equity));
        println!("    Author: {author} owns Code Equity: {share}");
    }
    Ok(())
}

pub fn output_json(entries: &[EquityEntry], repo_path: &Path, common: &CommonArgs) -> Result<()> {
    let output = EquityOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        repository_path: repo_path.to_string_lossy().to_string(),
        since: common.since.clone(),
        until: common.until.clone(),
        count_deletions: common.count_deletions,
        entries: entries.to_vec(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn output_ndjson(entries: &[EquityEntry]) -> Result<()> {
    for entry in entries {
        println!("{}", serde_json::to_string(entry)?);
    }
    Ok(())
}

// Red at 0%, green at 100%, interpolated linearly on the 6x6x6 ANSI cube.
fn equity_color(equity: f64) -> u8 {
    let green = ((equity / 100.0) * 255.0).round() as u8;
    let red = 255 - green;
    ansi_cube(red, green, 0)
}

fn ansi_cube(r: u8, g: u8, b: u8) -> u8 {
    let scale = |v: u8| ((v as u16 * 5 + 127) / 255) as u8;
    16 + 36 * scale(r) + 6 * scale(g) + scale(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_ramp_endpoints() {
        // 0% is pure red, 100% pure green on the cube
        assert_eq!(equity_color(0.0), 16 + 36 * 5);
        assert_eq!(equity_color(100.0), 16 + 6 * 5);
    }

    #[test]
    fn color_ramp_is_monotonic_toward_green() {
        let low = equity_color(10.0);
        let high = equity_color(90.0);
        let green_part = |c: u8| (c - 16) / 6 % 6;
        let red_part = |c: u8| (c - 16) / 36;
        assert!(green_part(high) > green_part(low));
        assert!(red_part(high) < red_part(low));
    }
}
