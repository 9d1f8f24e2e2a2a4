//! MATPOWER .m case parser
//!
//! Reads the subset of the MATPOWER case format pgopf needs: `mpc.baseMVA`,
//! `mpc.bus`, `mpc.gen` and `mpc.branch`. Other sections (`mpc.gencost`,
//! `mpc.areas`, ...) are skipped. Rows shorter than the section's required
//! column count, or holding non-numeric tokens, are errors that name the
//! section and the 1-based row.

use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::Path;

use pgopf_core::DEFAULT_BASE_MVA;

/// Parsed MATPOWER case data
#[derive(Debug)]
pub struct MatpowerCase {
    pub version: String,
    pub base_mva: f64,
    pub bus: Vec<MatpowerBus>,
    pub gen: Vec<MatpowerGen>,
    pub branch: Vec<MatpowerBranch>,
}

impl Default for MatpowerCase {
    fn default() -> Self {
        Self {
            version: String::new(),
            base_mva: DEFAULT_BASE_MVA,
            bus: Vec::new(),
            gen: Vec::new(),
            branch: Vec::new(),
        }
    }
}

/// `mpc.bus` row
#[derive(Debug, Clone)]
pub struct MatpowerBus {
    pub bus_i: usize,
    pub bus_type: i32,
    pub pd: f64,
    pub qd: f64,
    pub gs: f64,
    pub bs: f64,
    pub vm: f64,
    pub va: f64,
    pub base_kv: f64,
    pub vmax: f64,
    pub vmin: f64,
}

/// `mpc.gen` row
#[derive(Debug, Clone)]
pub struct MatpowerGen {
    pub gen_bus: usize,
    pub pg: f64,
    pub qg: f64,
    pub qmax: f64,
    pub qmin: f64,
    pub vg: f64,
    pub gen_status: i32,
    pub pmax: f64,
    pub pmin: f64,
}

/// `mpc.branch` row
#[derive(Debug, Clone)]
pub struct MatpowerBranch {
    pub f_bus: usize,
    pub t_bus: usize,
    pub br_r: f64,
    pub br_x: f64,
    pub br_b: f64,
    pub rate_a: f64,
    pub tap: f64,
    pub shift: f64,
    pub br_status: i32,
}

/// A row type of one MATPOWER matrix section.
trait SectionRow: Sized {
    const SECTION: &'static str;
    const MIN_COLUMNS: usize;

    fn from_values(values: &[f64]) -> Result<Self>;
}

impl SectionRow for MatpowerBus {
    const SECTION: &'static str = "mpc.bus";
    const MIN_COLUMNS: usize = 13;

    fn from_values(v: &[f64]) -> Result<Self> {
        Ok(MatpowerBus {
            bus_i: to_index(v[0], "bus_i")?,
            bus_type: to_flag(v[1], "bus_type")?,
            pd: v[2],
            qd: v[3],
            gs: v[4],
            bs: v[5],
            vm: v[7],
            va: v[8],
            base_kv: v[9],
            vmax: v[11],
            vmin: v[12],
        })
    }
}

impl SectionRow for MatpowerGen {
    const SECTION: &'static str = "mpc.gen";
    const MIN_COLUMNS: usize = 10;

    fn from_values(v: &[f64]) -> Result<Self> {
        Ok(MatpowerGen {
            gen_bus: to_index(v[0], "gen_bus")?,
            pg: v[1],
            qg: v[2],
            qmax: v[3],
            qmin: v[4],
            vg: v[5],
            gen_status: to_flag(v[7], "gen_status")?,
            pmax: v[8],
            pmin: v[9],
        })
    }
}

impl SectionRow for MatpowerBranch {
    const SECTION: &'static str = "mpc.branch";
    const MIN_COLUMNS: usize = 11;

    fn from_values(v: &[f64]) -> Result<Self> {
        Ok(MatpowerBranch {
            f_bus: to_index(v[0], "f_bus")?,
            t_bus: to_index(v[1], "t_bus")?,
            br_r: v[2],
            br_x: v[3],
            br_b: v[4],
            rate_a: v[5],
            tap: v[8],
            shift: v[9],
            br_status: to_flag(v[10], "br_status")?,
        })
    }
}

fn to_index(value: f64, field: &str) -> Result<usize> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Ok(value as usize)
    } else {
        Err(anyhow!("{field} must be a non-negative integer, got {value}"))
    }
}

fn to_flag(value: f64, field: &str) -> Result<i32> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= i32::MAX as f64 {
        Ok(value as i32)
    } else {
        Err(anyhow!("{field} must be an integer, got {value}"))
    }
}

/// Parse a MATPOWER .m file
pub fn parse_matpower_file(path: &Path) -> Result<MatpowerCase> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading MATPOWER file: {}", path.display()))?;
    parse_matpower_string(&content)
        .with_context(|| format!("parsing MATPOWER file: {}", path.display()))
}

/// Parse MATPOWER content from a string
pub fn parse_matpower_string(content: &str) -> Result<MatpowerCase> {
    let mut case = MatpowerCase::default();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let trimmed = strip_comment(line).trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some(name) = assignment_target(trimmed) else {
            continue;
        };

        match name {
            "mpc.version" => case.version = extract_inline_string(trimmed),
            "mpc.baseMVA" => {
                case.base_mva = extract_inline_scalar(trimmed)
                    .ok_or_else(|| anyhow!("mpc.baseMVA is not a number: {trimmed}"))?;
            }
            "mpc.bus" => case.bus = parse_section(trimmed, &mut lines)?,
            "mpc.gen" => case.gen = parse_section(trimmed, &mut lines)?,
            "mpc.branch" => case.branch = parse_section(trimmed, &mut lines)?,
            _ if trimmed.contains('[') && !trimmed.contains(']') => skip_matrix(&mut lines),
            _ => {}
        }
    }

    if case.bus.is_empty() {
        bail!("mpc.bus matrix not found");
    }

    Ok(case)
}

fn strip_comment(line: &str) -> &str {
    match line.find('%') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// `mpc.bus = [` -> `mpc.bus`; `mpc.gencost = [` -> `mpc.gencost`.
fn assignment_target(line: &str) -> Option<&str> {
    let (lhs, _) = line.split_once('=')?;
    let lhs = lhs.trim();
    lhs.starts_with("mpc.").then_some(lhs)
}

fn extract_inline_string(line: &str) -> String {
    line.split_once('=')
        .map(|(_, v)| {
            v.trim()
                .trim_matches(|c| c == '\'' || c == '"' || c == ';')
                .to_string()
        })
        .unwrap_or_default()
}

fn extract_inline_scalar(line: &str) -> Option<f64> {
    line.split_once('=')
        .and_then(|(_, v)| v.trim().trim_end_matches(';').trim().parse().ok())
}

fn skip_matrix<'a>(lines: &mut impl Iterator<Item = &'a str>) {
    for line in lines.by_ref() {
        if strip_comment(line).contains(']') {
            break;
        }
    }
}

/// Split one matrix line into numeric tokens. `None` for blank lines.
fn parse_row(line: &str) -> Result<Option<Vec<f64>>> {
    let values = line
        .split(|c: char| c.is_whitespace() || c == ';' || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| anyhow!("non-numeric value '{s}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((!values.is_empty()).then_some(values))
}

fn parse_section<'a, T: SectionRow>(
    header: &str,
    lines: &mut impl Iterator<Item = &'a str>,
) -> Result<Vec<T>> {
    let mut rows = Vec::new();
    let mut row_no = 0usize;

    let mut push_row = |data: &str, rows: &mut Vec<T>| -> Result<()> {
        if let Some(values) = parse_row(data)
            .with_context(|| format!("{} row {}", T::SECTION, row_no + 1))?
        {
            row_no += 1;
            if values.len() < T::MIN_COLUMNS {
                bail!(
                    "{} row {}: expected at least {} columns, found {}",
                    T::SECTION,
                    row_no,
                    T::MIN_COLUMNS,
                    values.len()
                );
            }
            let row = T::from_values(&values)
                .with_context(|| format!("{} row {}", T::SECTION, row_no))?;
            rows.push(row);
        }
        Ok(())
    };

    // Data may start on the header line after '['
    let after_bracket = header.split_once('[').map(|(_, rest)| rest).unwrap_or("");
    if let Some((data, _)) = after_bracket.split_once(']') {
        push_row(data, &mut rows)?;
        return Ok(rows);
    }
    push_row(after_bracket, &mut rows)?;

    for line in lines.by_ref() {
        let line = strip_comment(line);
        if let Some((data, _)) = line.split_once(']') {
            push_row(data, &mut rows)?;
            return Ok(rows);
        }
        push_row(line, &mut rows)?;
    }

    bail!("{} matrix is not terminated with '];'", T::SECTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_BUS: &str = r#"
function mpc = two_bus
mpc.version = '2';
mpc.baseMVA = 10;
%% bus data
mpc.bus = [
	1	3	0	0	0	0	1	1	0	230	1	1.1	0.9;
	2	1	20	5	0	0.5	1	1	0	230	1	1.1	0.9;  % load bus
];
mpc.gen = [
	1	0	0	30	-30	1.0	100	1	50	0	0	0	0	0	0	0	0	0	0	0	0;
];
mpc.branch = [
	1	2	0.01	0.1	0.02	100	100	100	0	0	1	-360	360;
];
mpc.gencost = [
	2	0	0	3	0.01	10	0;
];
"#;

    #[test]
    fn test_parse_two_bus() {
        let case = parse_matpower_string(TWO_BUS).unwrap();
        assert_eq!(case.version, "2");
        assert_eq!(case.base_mva, 10.0);
        assert_eq!(case.bus.len(), 2);
        assert_eq!(case.gen.len(), 1);
        assert_eq!(case.branch.len(), 1);

        assert_eq!(case.bus[1].pd, 20.0);
        assert_eq!(case.bus[1].bs, 0.5);
        assert_eq!(case.gen[0].pmax, 50.0);
        assert_eq!(case.branch[0].br_b, 0.02);
    }

    #[test]
    fn test_single_line_matrix() {
        let text = "mpc.bus = [1 3 0 0 0 0 1 1 0 230 1 1.1 0.9];";
        let case = parse_matpower_string(text).unwrap();
        assert_eq!(case.bus.len(), 1);
        assert_eq!(case.base_mva, DEFAULT_BASE_MVA);
    }

    #[test]
    fn test_short_row_reports_row_number() {
        let text = "mpc.bus = [\n1 3 0 0 0 0 1 1 0 230 1 1.1 0.9;\n2 1 20;\n];";
        let err = parse_matpower_string(text).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("mpc.bus row 2"), "{msg}");
        assert!(msg.contains("at least 13 columns"), "{msg}");
    }

    #[test]
    fn test_non_numeric_token() {
        let text = "mpc.bus = [\n1 3 x 0 0 0 1 1 0 230 1 1.1 0.9;\n];";
        let err = parse_matpower_string(text).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("row 1"), "{msg}");
        assert!(msg.contains("'x'"), "{msg}");
    }

    #[test]
    fn test_missing_bus_section() {
        assert!(parse_matpower_string("mpc.baseMVA = 100;").is_err());
    }

    #[test]
    fn test_unterminated_matrix() {
        let text = "mpc.bus = [\n1 3 0 0 0 0 1 1 0 230 1 1.1 0.9;\n";
        let err = parse_matpower_string(text).unwrap_err();
        assert!(err.to_string().contains("not terminated"));
    }
}
