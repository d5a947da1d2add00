//! Human-readable program listing.
//!
//! One line per instruction (address, labels, opcode, argument), followed by
//! the label and function tables. The listing is for inspection only; it is
//! not meant to be reassembled.

use std::collections::BTreeMap;

use hyc_common::Program;

/// Render a program as a listing.
pub fn listing(program: &Program) -> String {
    let mut lines = Vec::new();
    lines.push(format!("program: {} instruction(s)", program.len()));

    for (address, instr) in program.instructions.iter().enumerate() {
        let labels = if instr.labels.is_empty() {
            String::new()
        } else {
            format!("{}:", instr.labels.join(", "))
        };
        let line = format!(
            "{address:04}  {labels:<16} {:<6} {}",
            instr.opcode.name(),
            instr.argument
        );
        lines.push(line.trim_end().to_string());
    }

    lines.push("labels:".to_string());
    lines.extend(table(&program.label_map));
    lines.push("functions:".to_string());
    lines.extend(table(&program.func_map));

    let mut result = lines.join("\n");
    result.push('\n');
    result
}

/// `  name -> address` rows, in name order.
fn table(map: &BTreeMap<String, usize>) -> impl Iterator<Item = String> + '_ {
    map.iter().map(|(name, address)| format!("  {name} -> {address:04}"))
}
