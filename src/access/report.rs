//! Text report, CSV and HTML heatmap exports for [`AccessAnalyzer`] results.

use super::{AccessAnalyzer, AddressInfo, RegionKind};
use crate::architectures::apple2;
use crate::error::Result;
use crate::types::Address;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Executions above which a code region is called hot.
pub const HOT_THRESHOLD: u32 = 50;

/// Data regions longer than this get their size noted.
const BLOCK_NOTE_LEN: usize = 16;

/// Hottest addresses listed.
pub const HOT_LIST_LEN: usize = 20;

const RULE: &str = "====================================================================";

/// Render the plain-text report.
pub fn render_report(analyzer: &AccessAnalyzer<'_>, file_name: &str) -> String {
    let binary = analyzer.binary();
    let mut s = String::new();
    s.push_str(&format!("{RULE}\n"));
    s.push_str(&format!("Memory Access Analysis: {file_name}\n"));
    s.push_str(&format!(
        "Load address: ${:04X}, Size: {} bytes\n",
        binary.load_address(),
        binary.len()
    ));
    s.push_str(&format!("{RULE}\n"));

    zero_page_section(analyzer, &mut s);
    io_section(analyzer, &mut s);
    memory_map_section(analyzer, &mut s);
    hot_section(analyzer, &mut s);
    statistics_section(analyzer, &mut s);
    s
}

fn zero_page_section(analyzer: &AccessAnalyzer<'_>, s: &mut String) {
    let zp = analyzer.zero_page_summary();
    if zp.is_empty() {
        return;
    }
    s.push_str("\n=== Zero Page Usage ===\n");

    // Adjacent cells are reported as one pointer pair.
    let mut i = 0;
    while i < zp.len() {
        let (addr, info) = zp[i];
        let name = apple2::zero_page_name(addr);
        match zp.get(i + 1) {
            Some(&(next, next_info)) if next == addr + 1 => {
                let reads = info.read_count + next_info.read_count;
                let writes = info.write_count + next_info.write_count;
                let rw = (info.flags() | next_info.flags()).rw_str();
                let tag = match name {
                    Some(name) => format!(" - {name}"),
                    None if reads >= 2 => " - pointer".to_string(),
                    None => String::new(),
                };
                s.push_str(&format!(
                    "${addr:02X}-${next:02X} : {rw:<3} ({reads} reads, {writes} writes){tag}\n"
                ));
                i += 2;
            }
            _ => {
                let tag = name.map(|n| format!(" - {n}")).unwrap_or_default();
                s.push_str(&format!(
                    "${addr:02X}     : {:<3} ({} reads, {} writes){tag}\n",
                    info.flags().rw_str(),
                    info.read_count,
                    info.write_count
                ));
                i += 1;
            }
        }
    }
}

fn io_section(analyzer: &AccessAnalyzer<'_>, s: &mut String) {
    let io = analyzer.io_summary();
    if io.is_empty() {
        return;
    }
    s.push_str("\n=== I/O Registers Accessed ===\n");
    for (addr, name, info) in io {
        let parts = read_write_parts(info).join(", ");
        s.push_str(&format!("${addr:04X} {name:<20} : {parts}\n"));
    }
}

fn memory_map_section(analyzer: &AccessAnalyzer<'_>, s: &mut String) {
    let regions = analyzer.regions();
    if regions.is_empty() {
        return;
    }
    s.push_str("\n=== Memory Map ===\n");
    for region in regions {
        let infos: Vec<&AddressInfo> = region
            .addresses()
            .filter_map(|a| analyzer.info(a))
            .collect();

        let detail = match region.kind {
            RegionKind::Code => {
                let executions: u32 = infos.iter().map(|i| i.exec_count).sum();
                let callers: std::collections::BTreeSet<_> =
                    infos.iter().flat_map(|i| i.callers.iter()).collect();
                if executions > HOT_THRESHOLD {
                    format!(
                        " (hot: {executions} executions, called from {} locations)",
                        callers.len()
                    )
                } else if !callers.is_empty() {
                    format!(" (called from {} locations)", callers.len())
                } else {
                    String::new()
                }
            }
            RegionKind::Data => {
                let total = AddressInfo {
                    read_count: infos.iter().map(|i| i.read_count).sum(),
                    write_count: infos.iter().map(|i| i.write_count).sum(),
                    ..AddressInfo::default()
                };
                let mut parts = read_write_parts(&total);
                if region.len() > BLOCK_NOTE_LEN {
                    parts.push(format!("{}-byte block", region.len()));
                }
                if parts.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", parts.join(", "))
                }
            }
            RegionKind::Unknown => String::new(),
        };

        s.push_str(&format!(
            "${:04X}-${:04X} : {:<7} [{:>5} bytes]{detail}\n",
            region.start,
            region.end,
            region.kind.to_string().to_uppercase(),
            region.len()
        ));
    }
}

fn hot_section(analyzer: &AccessAnalyzer<'_>, s: &mut String) {
    let hot = analyzer.top_hot_code(HOT_LIST_LEN);
    if hot.is_empty() {
        return;
    }
    s.push_str(&format!("\n=== Top {} Hottest Code Addresses ===\n", hot.len()));
    for (addr, info) in hot {
        let sub = if analyzer.subroutines().contains(&addr) {
            " (subroutine entry)"
        } else {
            ""
        };
        let branch = if analyzer.branch_targets().contains(&addr) {
            " (branch target)"
        } else {
            ""
        };
        s.push_str(&format!(
            "${addr:04X} : {} estimated executions{sub}{branch}\n",
            info.exec_count
        ));
    }
}

fn statistics_section(analyzer: &AccessAnalyzer<'_>, s: &mut String) {
    let code = analyzer.iter().filter(|(_, i)| i.exec_count > 0).count();
    let data = analyzer
        .iter()
        .filter(|(_, i)| i.exec_count == 0 && i.is_data_accessed())
        .count();
    s.push_str("\n=== Statistics ===\n");
    s.push_str(&format!("Code bytes:     {code}\n"));
    s.push_str(&format!("Data refs:      {data}\n"));
    s.push_str(&format!("Subroutines:    {}\n", analyzer.subroutines().len()));
    s.push_str(&format!("Branch targets: {}\n", analyzer.branch_targets().len()));
}

fn read_write_parts(info: &AddressInfo) -> Vec<String> {
    let mut parts = Vec::new();
    if info.read_count > 0 {
        parts.push(format!("{} reads", info.read_count));
    }
    if info.write_count > 0 {
        parts.push(format!("{} writes", info.write_count));
    }
    parts
}

/// Quote a CSV field when it contains a comma, quote or newline.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write one CSV row per address of the binary.
///
/// # Errors
///
/// Propagates I/O errors from `out`.
pub fn write_csv<W: Write>(analyzer: &AccessAnalyzer<'_>, out: &mut W) -> io::Result<()> {
    writeln!(out, "address,type,read_count,write_count,exec_count,notes")?;
    let empty = AddressInfo::default();
    for addr in analyzer.binary().addresses() {
        let info = analyzer.info(addr).unwrap_or(&empty);

        let mut notes: Vec<&str> = Vec::new();
        notes.extend(apple2::hardware_name(addr));
        notes.extend(apple2::zero_page_name(addr));
        if analyzer.subroutines().contains(&addr) {
            notes.push("subroutine");
        }
        if analyzer.branch_targets().contains(&addr) {
            notes.push("branch_target");
        }

        writeln!(
            out,
            "${addr:04X},{},{},{},{},{}",
            info.kind(),
            info.read_count,
            info.write_count,
            info.exec_count,
            csv_field(&notes.join("; "))
        )?;
    }
    Ok(())
}

/// Write the CSV export to `path`.
///
/// # Errors
///
/// [`DisasmError::Io`](crate::DisasmError::Io) if the file cannot be
/// created or written.
pub fn export_csv(analyzer: &AccessAnalyzer<'_>, path: impl AsRef<Path>) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_csv(analyzer, &mut out)?;
    out.flush()?;
    Ok(())
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Memory Access Heatmap - {title}</title>
<style>
body { font-family: 'Consolas', 'Courier New', monospace; background: #1a1a2e; color: #e0e0e0; padding: 20px; }
h1 { color: #c8d6e5; margin-bottom: 4px; font-size: 1.3em; }
.meta, .stats { color: #8899aa; font-size: 0.85em; margin: 8px 0 16px 0; }
.legend { display: flex; gap: 18px; margin-bottom: 14px; font-size: 0.8em; }
.swatch { width: 16px; height: 16px; border: 1px solid #555; display: inline-block; vertical-align: middle; }
table { border-collapse: collapse; font-size: 11px; line-height: 1; }
th.addr { text-align: right; padding: 1px 6px 1px 0; color: #8899aa; font-weight: normal; }
th.colhdr { text-align: center; padding: 0 2px 4px 2px; color: #667788; font-weight: normal; }
td { width: 22px; height: 18px; text-align: center; padding: 1px; border: 1px solid #2a2a3e; font-size: 10px; color: #ddd; }
.code { background-color: #2a6fdb; }
.data { background-color: #27ae60; }
.io { background-color: #e74c3c; }
.hot { background-color: #f1c40f; color: #222; }
.unused { background-color: #333; color: #666; }
td.empty { background: transparent; border: none; }
</style>
</head>
<body>
<h1>Memory Access Heatmap</h1>
"#;

const HTML_LEGEND: &str = r#"<div class="legend">
<span><span class="swatch code"></span> Code</span>
<span><span class="swatch data"></span> Data</span>
<span><span class="swatch io"></span> I/O access</span>
<span><span class="swatch hot"></span> Hot spot</span>
<span><span class="swatch unused"></span> Unused / unknown</span>
</div>
"#;

/// Escape text for an HTML body or a quoted attribute.
fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Colour class and opacity of one heatmap cell.
fn cell_style(info: &AddressInfo, addr: Address, max_exec: u32, max_read: u32) -> (&'static str, f64) {
    let accesses = f64::from(info.read_count + info.write_count);
    let exec = f64::from(info.exec_count) / f64::from(max_exec);
    if apple2::is_io(addr) && info.is_data_accessed() {
        ("io", (accesses / f64::from(max_read) * 2.0).min(1.0))
    } else if info.exec_count > 0 {
        if f64::from(info.exec_count) > f64::from(max_exec) * 0.5 {
            ("hot", exec.min(1.0))
        } else {
            ("code", exec.clamp(0.25, 1.0))
        }
    } else if info.is_data_accessed() {
        ("data", (accesses / f64::from(max_read)).clamp(0.25, 1.0))
    } else {
        ("unused", 0.15)
    }
}

/// Hover text of one heatmap cell, unescaped.
fn cell_tooltip(analyzer: &AccessAnalyzer<'_>, addr: Address, byte: u8, info: &AddressInfo) -> String {
    let mut parts = vec![format!("${addr:04X}: ${byte:02X}"), format!("Type: {}", info.kind())];
    if info.exec_count > 0 {
        parts.push(format!("Exec: {}", info.exec_count));
    }
    if info.read_count > 0 {
        parts.push(format!("Read: {}", info.read_count));
    }
    if info.write_count > 0 {
        parts.push(format!("Write: {}", info.write_count));
    }
    if let Some(hw) = apple2::hardware_name(addr) {
        parts.push(format!("HW: {hw}"));
    }
    if let Some(zp) = apple2::zero_page_name(addr) {
        parts.push(format!("ZP: {zp}"));
    }
    if analyzer.subroutines().contains(&addr) {
        parts.push("[SUBROUTINE]".to_string());
    }
    if analyzer.branch_targets().contains(&addr) {
        parts.push("[BRANCH TARGET]".to_string());
    }
    parts.join(" | ")
}

/// Render a self-contained HTML heatmap, sixteen bytes per row.
pub fn render_html(analyzer: &AccessAnalyzer<'_>, file_name: &str) -> String {
    let binary = analyzer.binary();
    let empty = AddressInfo::default();
    let max_exec = binary
        .addresses()
        .filter_map(|a| analyzer.info(a))
        .map(|i| i.exec_count)
        .max()
        .unwrap_or(0)
        .max(1);
    let max_read = analyzer.iter().map(|(_, i)| i.read_count).max().unwrap_or(0).max(1);

    let title = html_escape(file_name);
    let mut s = HTML_HEAD.replace("{title}", &title);
    s.push_str(&format!(
        "<div class=\"meta\">{title} &mdash; Load: ${:04X}, Size: {} bytes, End: ${:04X}</div>\n",
        binary.load_address(),
        binary.len(),
        binary.last_address()
    ));
    s.push_str(HTML_LEGEND);

    s.push_str("<table>\n<thead>\n<tr><th></th>");
    for col in 0..16 {
        s.push_str(&format!("<th class=\"colhdr\">{col:X}</th>"));
    }
    s.push_str("</tr>\n</thead>\n<tbody>\n");

    let bytes = binary.bytes();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let row_start = binary.address_at(row * 16);
        s.push_str(&format!("<tr><th class=\"addr\">${row_start:04X}</th>"));
        for (col, &byte) in chunk.iter().enumerate() {
            let addr = row_start.wrapping_add(col as u16);
            let info = analyzer.info(addr).unwrap_or(&empty);
            let (class, intensity) = cell_style(info, addr, max_exec, max_read);
            let tooltip = html_escape(&cell_tooltip(analyzer, addr, byte, info));
            s.push_str(&format!(
                "<td class=\"{class}\" style=\"opacity:{:.2};\" title=\"{tooltip}\">{byte:02X}</td>",
                intensity.max(0.15)
            ));
        }
        for _ in chunk.len()..16 {
            s.push_str("<td class=\"empty\"></td>");
        }
        s.push_str("</tr>\n");
    }
    s.push_str("</tbody>\n</table>\n");

    let code = binary
        .addresses()
        .filter(|&a| analyzer.info(a).is_some_and(|i| i.exec_count > 0))
        .count();
    let data = analyzer
        .iter()
        .filter(|(_, i)| i.exec_count == 0 && i.is_data_accessed())
        .count();
    s.push_str(&format!(
        "<div class=\"stats\">Code bytes: {code} &bull; Data refs: {data} &bull; \
         Subroutines: {} &bull; Branch targets: {}</div>\n",
        analyzer.subroutines().len(),
        analyzer.branch_targets().len()
    ));
    s.push_str("</body>\n</html>\n");
    s
}

/// Write the HTML heatmap to `path`.
///
/// # Errors
///
/// [`DisasmError::Io`](crate::DisasmError::Io) if the file cannot be
/// written.
pub fn export_html(
    analyzer: &AccessAnalyzer<'_>,
    path: impl AsRef<Path>,
    file_name: &str,
) -> Result<()> {
    std::fs::write(path, render_html(analyzer, file_name))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Binary;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("KEYBOARD"), "KEYBOARD");
        assert_eq!(csv_field("a, b"), "\"a, b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field(""), "");
    }

    #[test]
    fn test_csv_rows() {
        // JSR $0804; RTS; RTS
        let b = Binary::new(vec![0x20, 0x04, 0x08, 0x60, 0x60], 0x0800).unwrap();
        let a = AccessAnalyzer::analyze_flow(&b, 0x0800);
        let mut out = Vec::new();
        write_csv(&a, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = "\
address,type,read_count,write_count,exec_count,notes
$0800,code,0,0,1,
$0801,code,0,0,1,
$0802,code,0,0,1,
$0803,code,0,0,1,
$0804,code,1,0,1,subroutine
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_export_csv_file() {
        let b = Binary::new(vec![0xAD, 0x00, 0xC0, 0x60], 0xC000).unwrap();
        let a = AccessAnalyzer::analyze_linear(&b);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.csv");
        export_csv(&a, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("$C000,code,1,0,1,KEYBOARD\n"));
    }

    #[test]
    fn test_report_sections() {
        // LDA $24; STA $25; LDA $C000; BIT $C010; LDA $0810,X; RTS
        let mut bytes = vec![
            0xA5, 0x24, 0x85, 0x25, 0xAD, 0x00, 0xC0, 0x2C, 0x10, 0xC0, 0xBD, 0x10, 0x08, 0x60,
        ];
        bytes.resize(0x30, 0x00);
        let b = Binary::new(bytes, 0x0800).unwrap();
        let a = AccessAnalyzer::analyze_flow(&b, 0x0800);
        let report = render_report(&a, "TEST.BIN");

        assert!(report.contains("Memory Access Analysis: TEST.BIN\n"));
        assert!(report.contains("Load address: $0800, Size: 48 bytes\n"));
        assert!(report.contains("$24-$25 : RW  (1 reads, 1 writes) - CH (cursor H)\n"));
        assert!(report.contains("$C000 KEYBOARD             : 1 reads\n"));
        assert!(report.contains("$C010 KBDSTRB              : 1 reads\n"));
        assert!(report.contains("$0800-$080D : CODE    [   14 bytes]\n"));
        assert!(report.contains("$0810-$0810 : DATA    [    1 bytes] (1 reads)\n"));
        assert!(report.contains("=== Top 14 Hottest Code Addresses ===\n"));
        assert!(report.contains("Code bytes:     14\n"));
        assert!(report.contains("Data refs:      5\n"));

        let zp = report.find("=== Zero Page Usage ===").unwrap();
        let io = report.find("=== I/O Registers Accessed ===").unwrap();
        let map = report.find("=== Memory Map ===").unwrap();
        let stats = report.find("=== Statistics ===").unwrap();
        assert!(zp < io && io < map && map < stats);
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
        assert_eq!(html_escape("HTAB"), "HTAB");
    }

    #[test]
    fn test_html_cells() {
        // LDA $C000; JSR $0807; RTS; RTS; <unused>
        let bytes = vec![0xAD, 0x00, 0xC0, 0x20, 0x07, 0x08, 0x60, 0x60, 0x00];
        let b = Binary::new(bytes, 0x0800).unwrap();
        let a = AccessAnalyzer::analyze_flow(&b, 0x0800);
        let html = render_html(&a, "<GAME>.BIN");

        assert!(html.contains("<title>Memory Access Heatmap - &lt;GAME&gt;.BIN</title>"));
        assert!(html.contains("<tr><th class=\"addr\">$0800</th>"));
        assert!(html.contains("Load: $0800, Size: 9 bytes, End: $0808"));
        assert_eq!(html.matches("<td class=\"empty\"></td>").count(), 15);
        assert!(html.contains(
            "<td class=\"unused\" style=\"opacity:0.15;\" title=\"$0808: $00 | Type: unknown\">00</td>"
        ));
        assert!(html.contains(
            "title=\"$0807: $60 | Type: code | Exec: 1 | Read: 1 | [SUBROUTINE]\">60</td>"
        ));
        assert!(html.contains("Code bytes: 8 &bull; Data refs: 1 &bull; Subroutines: 1"));
    }

    #[test]
    fn test_html_io_cell() {
        // Loaded in the I/O page: the soft switch read is coloured as I/O.
        let b = Binary::new(vec![0xAD, 0x03, 0xC0, 0x60], 0xC000).unwrap();
        let a = AccessAnalyzer::analyze_linear(&b);
        let html = render_html(&a, "IO.BIN");
        assert!(html.contains("<td class=\"io\" style=\"opacity:1.00;\" title=\"$C003: $60"));
        assert!(html.contains("<td class=\"hot\" style=\"opacity:1.00;\" title=\"$C000: $AD"));
    }

    #[test]
    fn test_export_html_file() {
        let b = Binary::new(vec![0x60], 0x0800).unwrap();
        let a = AccessAnalyzer::analyze_flow(&b, 0x0800);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heat.html");
        export_html(&a, &path, "RTS.BIN").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<!DOCTYPE html>\n"));
        assert!(text.ends_with("</html>\n"));
    }

    #[test]
    fn test_report_for_unreached_entry() {
        let b = Binary::new(vec![0xEA, 0x60], 0x0800).unwrap();
        let a = AccessAnalyzer::analyze_flow(&b, 0x2000);
        let report = render_report(&a, "NOP.BIN");
        assert!(report.contains("$0800-$0801 : UNKNOWN [    2 bytes]\n"));
        assert!(report.contains("Code bytes:     0\n"));
        assert!(report.contains("Subroutines:    0\n"));
        assert!(!report.contains("Hottest"));
    }
}
