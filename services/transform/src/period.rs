use std::path::Path;

/// Reporting period of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub quarter: u32,
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
}

/// Period from the name of the folder that directly contains `path`
/// (`<year>_<quarter>_...`). File contents are never consulted.
pub fn extract_period(path: &Path) -> Option<Period> {
    let folder = path.parent()?.file_name()?.to_str()?;
    let mut parts = folder.split('_');
    let (year, quarter) = (parts.next()?, parts.next()?);

    if !is_numeric(year) || !is_numeric(quarter) {
        return None;
    }

    Some(Period {
        year: year.parse().ok()?,
        quarter: quarter.parse().ok()?,
    })
}
