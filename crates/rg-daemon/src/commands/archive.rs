//! Archive command for printing stored rain over a calendar window.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rg_core::ArchivePeriod;

use super::open_database;
use crate::Config;
use crate::http::types::ArchiveResponse;

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    period: ArchivePeriod,
    json: bool,
) -> Result<()> {
    run_at(writer, config, period, json, Utc::now())
}

fn run_at<W: Write>(
    writer: &mut W,
    config: &Config,
    period: ArchivePeriod,
    json: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let bucket_size = config.bucket_size()?;
    let db = open_database(config)?;
    let data = match period.window(now) {
        Some(window) => db.archive(&window)?,
        None => Default::default(),
    };

    if json {
        let response = ArchiveResponse {
            period: period.to_string(),
            divider: bucket_size.divider(),
            data,
        };
        serde_json::to_writer_pretty(&mut *writer, &response)?;
        writeln!(writer)?;
        return Ok(());
    }

    if data.is_empty() {
        writeln!(writer, "No rain recorded {period}.")?;
        return Ok(());
    }

    let total: i64 = data.values().sum();
    for (bucket, amount) in &data {
        writeln!(writer, "{bucket:>5} {amount:>6}")?;
    }
    writeln!(
        writer,
        "total {total:>6} ({}\" at divider {})",
        bucket_size.inches(total),
        bucket_size.divider()
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use rg_core::RainRecord;
    use rg_db::Database;

    use insta::assert_snapshot;

    fn seeded_config(temp: &tempfile::TempDir) -> Config {
        let db_path = temp.path().join("rg11.db");
        let mut db = Database::open(&db_path).unwrap();
        for (day, hour, amount) in [(5, 10, 3), (5, 11, 2), (12, 0, 5)] {
            db.insert_rain(&RainRecord {
                timestamp: Utc
                    .with_ymd_and_hms(2025, 3, day, hour, 0, 0)
                    .unwrap()
                    .timestamp(),
                amount,
                divider: 1_000,
            })
            .unwrap();
        }
        Config {
            database_path: db_path,
            ..Config::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, 8, 0, 0).unwrap()
    }

    #[test]
    fn archive_table_output() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp);

        let mut output = Vec::new();
        run_at(&mut output, &config, ArchivePeriod::ThisMonth, false, now()).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r#"
         0510      3
         0511      2
         1200      5
        total     10 (0.01" at divider 1000)
        "#);
    }

    #[test]
    fn archive_json_output() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp);

        let mut output = Vec::new();
        run_at(&mut output, &config, ArchivePeriod::ThisYear, true, now()).unwrap();

        let response: ArchiveResponse = serde_json::from_slice(&output).unwrap();
        assert_eq!(response.period, "thisyear");
        assert_eq!(response.divider, 1_000);
        assert_eq!(response.data.get("064"), Some(&5));
        assert_eq!(response.data.get("071"), Some(&5));
    }

    #[test]
    fn archive_empty_window() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp);

        let mut output = Vec::new();
        run_at(&mut output, &config, ArchivePeriod::LastMonth, false, now()).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "No rain recorded lastmonth.\n"
        );
    }
}
