#![forbid(unsafe_code)]

//! Text rendering of the lab.
//!
//! [`render`] is a pure function from lab state and terminal size to screen
//! lines, so the layout is testable without a terminal.

use mountlab_core::{AnimatedItem, MountLab, header_line, host::DEFAULT_LOOP};

use crate::keymap::KEY_HELP;

/// Spinner frames cycled over one animation loop.
pub const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Columns taken by one grid cell.
pub const CELL_WIDTH: usize = 8;

const TITLE: &str = "Lottie Mount Lab";
const EMPTY_TITLE: &str = "No animations mounted";
const EMPTY_HINT: &str = "Press m to mount the grid, or s to start the stress test.";
const INSTRUCTIONS: [&str; 2] = [
    "Watch the log for item_created / item_destroyed pairs.",
    "Every creation must be matched by a destruction before its generation is gone.",
];

/// Rows outside the grid: title, header, count, buttons, two rules,
/// instructions, key help, status.
const CHROME_ROWS: usize = 8 + INSTRUCTIONS.len();

/// Render the lab into at most `height` lines of at most `width` columns.
pub fn render(lab: &MountLab, width: u16, height: u16) -> Vec<String> {
    let width = usize::from(width).max(1);
    let height = usize::from(height);
    let snapshot = lab.snapshot();
    let controls = lab.controls();
    let rule = "─".repeat(width);

    let mut lines = vec![
        TITLE.to_string(),
        header_line(&snapshot),
        format!("Animations: [-] {} [+]", snapshot.count),
        buttons(controls.mount_label, controls.remount_enabled, controls.stress_label),
        rule.clone(),
    ];

    let grid_rows = height.saturating_sub(CHROME_ROWS).max(1);
    if lab.host().is_empty() {
        lines.push(EMPTY_TITLE.to_string());
        if grid_rows > 1 {
            lines.push(EMPTY_HINT.to_string());
        }
    } else {
        let items: Vec<&AnimatedItem> = lab.host().items().collect();
        lines.extend(grid(&items, width, grid_rows));
    }

    lines.push(rule);
    lines.extend(INSTRUCTIONS.iter().map(|s| s.to_string()));
    lines.push(KEY_HELP.to_string());
    lines.push(format!("Status: {}", lab.status()));

    for line in &mut lines {
        truncate(line, width);
    }
    lines
}

fn buttons(mount: &str, remount: bool, stress: &str) -> String {
    let mut out = format!("[m] {mount}");
    if remount {
        out.push_str("   [r] Remount");
    }
    out.push_str("   [s] ");
    out.push_str(stress);
    out
}

/// Lay items out in rows of fixed-width cells. When they do not fit, the
/// last row reports how many were left out.
fn grid(items: &[&AnimatedItem], width: usize, max_rows: usize) -> Vec<String> {
    let columns = (width / CELL_WIDTH).max(1);
    let needed = items.len().div_ceil(columns);
    let shown_rows = if needed > max_rows {
        max_rows.saturating_sub(1)
    } else {
        needed
    };
    let shown = (shown_rows * columns).min(items.len());

    let mut rows: Vec<String> = items[..shown]
        .chunks(columns)
        .map(|row| row.iter().map(|item| cell(item)).collect())
        .collect();
    if shown < items.len() {
        rows.push(format!("… {} more", items.len() - shown));
    }
    rows
}

fn cell(item: &AnimatedItem) -> String {
    let frame = SPINNER[item.frame(DEFAULT_LOOP, SPINNER.len())];
    let label = format!("{frame} #{}", item.identity().index);
    format!("{label:<CELL_WIDTH$}")
}

fn truncate(line: &mut String, width: usize) {
    if let Some((idx, _)) = line.char_indices().nth(width) {
        line.truncate(idx);
    }
    let trimmed = line.trim_end().len();
    line.truncate(trimmed);
}
