//! Line-oriented attribute files.
//!
//! Every line holds exactly one record. Parsing is strict: integers go
//! through `i32::from_str` (no surrounding whitespace, no trailing garbage),
//! each schema expects exactly its separators, and any deviation is a fatal
//! [`Error::Parse`] naming the 1-based line number.
//!
//! | Schema | Item line      | Query line          |
//! |--------|----------------|---------------------|
//! | `EM`   | `<v>`          | `<v>`               |
//! | `R`    | `<v>`          | `<start>-<end>`     |
//! | `EMIS` | `<v>[,<v>]*`   | `<v>`               |
//! | `EM_R` | `<em>,<r>`     | `<em>,<start>-<end>`|

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::filter::{EmRangeItem, EmRangeQuery, FilterType, ItemAttributes, QueryAttributes, Range};

type LineResult<T> = std::result::Result<T, String>;

/// Reads one integer per line (`EM`/`R` items, `EM`/`EMIS` queries).
pub fn read_single_values<P: AsRef<Path>>(path: P) -> Result<Vec<i32>> {
    parse_lines(path.as_ref(), parse_int)
}

/// Reads one `<start>-<end>` range per line (`R` queries).
pub fn read_ranges<P: AsRef<Path>>(path: P) -> Result<Vec<Range>> {
    parse_lines(path.as_ref(), parse_range)
}

/// Reads one comma-separated value set per line (`EMIS` items).
pub fn read_value_sets<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<i32>>> {
    parse_lines(path.as_ref(), parse_set)
}

/// Reads one `<em>,<r>` pair per line (`EM_R` items).
pub fn read_em_range_items<P: AsRef<Path>>(path: P) -> Result<Vec<EmRangeItem>> {
    parse_lines(path.as_ref(), parse_em_range_item)
}

/// Reads one `<em>,<start>-<end>` triple per line (`EM_R` queries).
pub fn read_em_range_queries<P: AsRef<Path>>(path: P) -> Result<Vec<EmRangeQuery>> {
    parse_lines(path.as_ref(), parse_em_range_query)
}

/// Loads item attributes for the given schema.
pub fn load_item_attributes<P: AsRef<Path>>(
    filter_type: FilterType,
    path: P,
) -> Result<ItemAttributes> {
    let path = path.as_ref();
    Ok(match filter_type {
        FilterType::Em => ItemAttributes::Em(read_single_values(path)?),
        FilterType::R => ItemAttributes::R(read_single_values(path)?),
        FilterType::Emis => ItemAttributes::Emis(read_value_sets(path)?),
        FilterType::EmR => ItemAttributes::EmR(read_em_range_items(path)?),
    })
}

/// Loads query attributes for the given schema.
pub fn load_query_attributes<P: AsRef<Path>>(
    filter_type: FilterType,
    path: P,
) -> Result<QueryAttributes> {
    let path = path.as_ref();
    Ok(match filter_type {
        FilterType::Em => QueryAttributes::Em(read_single_values(path)?),
        FilterType::R => QueryAttributes::R(read_ranges(path)?),
        FilterType::Emis => QueryAttributes::Emis(read_single_values(path)?),
        FilterType::EmR => QueryAttributes::EmR(read_em_range_queries(path)?),
    })
}

fn parse_lines<T, F>(path: &Path, parse_line: F) -> Result<Vec<T>>
where
    F: Fn(&str) -> LineResult<T>,
{
    let file = File::open(path)
        .map_err(|e| Error::Io(format!("open {} failed: {}", path.display(), e)))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line.map_err(|e| {
            Error::Io(format!(
                "read {} line {} failed: {}",
                path.display(),
                line_number,
                e
            ))
        })?;
        let record = parse_line(&line).map_err(|reason| Error::Parse {
            path: path.to_path_buf(),
            line: line_number,
            reason,
        })?;
        records.push(record);
    }

    Ok(records)
}

fn parse_int(token: &str) -> LineResult<i32> {
    token
        .parse::<i32>()
        .map_err(|_| format!("invalid integer {:?}", token))
}

fn parse_range(text: &str) -> LineResult<Range> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| format!("missing '-' in range {:?}", text))?;
    Ok(Range::new(parse_int(start)?, parse_int(end)?))
}

fn parse_set(line: &str) -> LineResult<Vec<i32>> {
    if line.is_empty() {
        return Err("empty value set".to_string());
    }
    line.split(',').map(parse_int).collect()
}

fn parse_em_range_item(line: &str) -> LineResult<EmRangeItem> {
    let (em, r) = line
        .split_once(',')
        .ok_or_else(|| "expected <em>,<r>: missing ','".to_string())?;
    Ok(EmRangeItem {
        em: parse_int(em)?,
        r: parse_int(r)?,
    })
}

fn parse_em_range_query(line: &str) -> LineResult<EmRangeQuery> {
    let (em, range) = line
        .split_once(',')
        .ok_or_else(|| "expected <em>,<start>-<end>: missing ','".to_string())?;
    Ok(EmRangeQuery {
        em: parse_int(em)?,
        range: parse_range(range)?,
    })
}
