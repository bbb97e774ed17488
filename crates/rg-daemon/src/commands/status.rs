//! Status command for showing the database and the last recorded rain.

use std::io::Write;

use anyhow::Result;
use rg_core::{BucketSize, clock};

use super::open_database;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let bucket_size = config.bucket_size()?;
    let db = open_database(config)?;
    let rows = db.count_rain()?;
    let last = db.last_rain()?;

    writeln!(writer, "Rain gauge status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Divider:  {}", bucket_size.divider())?;
    writeln!(writer, "Minutes with rain: {rows}")?;

    let Some(last) = last else {
        writeln!(writer, "No rain recorded.")?;
        return Ok(());
    };

    // Inches use the divider the row was stored with.
    let inches = BucketSize::ALL
        .into_iter()
        .find(|size| size.divider() == last.divider)
        .map_or_else(|| "?".to_string(), |size| size.inches(last.amount).to_string());
    writeln!(
        writer,
        "Last rain: {} ({} tips, {inches}\")",
        clock::iso_timestamp(last.timestamp),
        last.amount
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rg_core::RainRecord;
    use rg_db::Database;

    use insta::assert_snapshot;

    fn config_for(db_path: std::path::PathBuf) -> Config {
        Config {
            database_path: db_path,
            ..Config::default()
        }
    }

    #[test]
    fn status_command_outputs_last_rain() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("rg11.db");
        let mut db = Database::open(&db_path).unwrap();
        db.insert_rain(&RainRecord {
            timestamp: 1_741_169_640,
            amount: 1,
            divider: 1_000,
        })
        .unwrap();
        db.insert_rain(&RainRecord {
            timestamp: 1_741_169_700,
            amount: 3,
            divider: 1_000,
        })
        .unwrap();
        drop(db);

        let config = config_for(db_path.clone());
        let mut output = Vec::new();
        run(&mut output, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/rg11.db");
        assert_snapshot!(output, @r#"
        Rain gauge status
        Database: [TEMP]/rg11.db
        Divider:  1000
        Minutes with rain: 2
        Last rain: 2025-03-05T10:15:00 (3 tips, 0.003")
        "#);
    }

    #[test]
    fn status_command_without_rain() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("nested").join("rg11.db");

        let config = config_for(db_path.clone());
        let mut output = Vec::new();
        run(&mut output, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Minutes with rain: 0"));
        assert!(output.ends_with("No rain recorded.\n"));
        assert!(db_path.exists());
    }
}
