//! FortiAnalyzer report XML cleaning and table extraction
//!
//! The downloaded payload carries trailing bytes after the closing report
//! tag; `clean_report_xml` truncates them before `parse_report` extracts the
//! two tables the poster pipeline consumes.

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::domain::report::{ReportData, ReportRecord};

/// Table holding hosts flagged as botnet victims.
pub const BOTNET_VICTIMS_TABLE: &str = "Botnet Victims";
/// Table holding the per-user bandwidth ranking.
pub const TOP_USERS_TABLE: &str = "Top 20 Users by Bandwidth (exclude servers)";

const CLOSING_TAG: &str = "</FortiAnalyzer_Report>";

/// Errors raised while extracting the report datasets.
#[derive(Debug, thiserror::Error)]
pub enum ReportParseError {
    #[error("XML syntax error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("table not found in report: {name}")]
    TableNotFound { name: String },

    #[error("record without value attribute in table {table}")]
    MissingValue { table: String },
}

/// Drop everything after the closing report tag (and its trailing CRLF when
/// present). Input without the closing tag is returned unchanged.
pub fn clean_report_xml(raw: &str) -> &str {
    match raw.find(CLOSING_TAG) {
        Some(index) => {
            let mut end = index + CLOSING_TAG.len();
            if raw[end..].starts_with("\r\n") {
                end += 2;
            } else if raw[end..].starts_with('\n') {
                end += 1;
            }
            &raw[..end]
        }
        None => raw,
    }
}

/// Extract the botnet-victims and top-users tables into ordered records.
///
/// Each `<id value="...">` element becomes one record: the `value` attribute
/// plus its child elements as an ordered field map with trimmed text. Both
/// tables must be present; a report missing one is a failed acquisition.
pub fn parse_report(xml: &str) -> Result<ReportData, ReportParseError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut botnet_victims: Option<Vec<ReportRecord>> = None;
    let mut top_users: Option<Vec<ReportRecord>> = None;

    let mut current_table: Option<String> = None;
    let mut current_record: Option<ReportRecord> = None;
    let mut current_field: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "table" {
                    let table_name = e
                        .try_get_attribute("name")
                        .map_err(quick_xml::Error::from)?
                        .map(|a| String::from_utf8_lossy(&a.value).to_string());
                    current_table = match table_name.as_deref() {
                        Some(BOTNET_VICTIMS_TABLE) | Some(TOP_USERS_TABLE) => table_name,
                        _ => None,
                    };
                } else if name == "id" && current_table.is_some() {
                    let table = current_table.as_deref().unwrap_or_default().to_string();
                    let value = e
                        .try_get_attribute("value")
                        .map_err(quick_xml::Error::from)?
                        .map(|a| String::from_utf8_lossy(&a.value).to_string())
                        .ok_or(ReportParseError::MissingValue { table })?;
                    current_record = Some(ReportRecord {
                        value,
                        fields: IndexMap::new(),
                    });
                } else if current_record.is_some() {
                    current_field = Some(name);
                }
            }
            Event::Empty(e) => {
                // Self-closing forms carry the same meaning as an empty
                // Start/End pair.
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "table" {
                    let table_name = e
                        .try_get_attribute("name")
                        .map_err(quick_xml::Error::from)?
                        .map(|a| String::from_utf8_lossy(&a.value).to_string());
                    match table_name.as_deref() {
                        Some(BOTNET_VICTIMS_TABLE) => {
                            botnet_victims.get_or_insert_with(Vec::new);
                        }
                        Some(TOP_USERS_TABLE) => {
                            top_users.get_or_insert_with(Vec::new);
                        }
                        _ => {}
                    }
                } else if name == "id" {
                    if let Some(table) = current_table.as_deref() {
                        let value = e
                            .try_get_attribute("value")
                            .map_err(quick_xml::Error::from)?
                            .map(|a| String::from_utf8_lossy(&a.value).to_string())
                            .ok_or_else(|| ReportParseError::MissingValue {
                                table: table.to_string(),
                            })?;
                        let rows = if table == BOTNET_VICTIMS_TABLE {
                            botnet_victims.get_or_insert_with(Vec::new)
                        } else {
                            top_users.get_or_insert_with(Vec::new)
                        };
                        rows.push(ReportRecord {
                            value,
                            fields: IndexMap::new(),
                        });
                    }
                } else if let Some(record) = current_record.as_mut() {
                    record.fields.insert(name, String::new());
                }
            }
            Event::Text(t) => {
                if let (Some(record), Some(field)) =
                    (current_record.as_mut(), current_field.as_deref())
                {
                    let text = reader
                        .decoder()
                        .decode(t.as_ref())
                        .map_err(quick_xml::Error::from)?
                        .trim()
                        .to_string();
                    record.fields.insert(field.to_string(), text);
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "id" {
                    if let (Some(record), Some(table)) =
                        (current_record.take(), current_table.as_deref())
                    {
                        let rows = if table == BOTNET_VICTIMS_TABLE {
                            botnet_victims.get_or_insert_with(Vec::new)
                        } else {
                            top_users.get_or_insert_with(Vec::new)
                        };
                        rows.push(record);
                    }
                    current_field = None;
                } else if name == "table" {
                    // A matched table with no rows still counts as present.
                    match current_table.as_deref() {
                        Some(BOTNET_VICTIMS_TABLE) => {
                            botnet_victims.get_or_insert_with(Vec::new);
                        }
                        Some(TOP_USERS_TABLE) => {
                            top_users.get_or_insert_with(Vec::new);
                        }
                        _ => {}
                    }
                    current_table = None;
                    current_record = None;
                    current_field = None;
                } else if current_record.is_some() {
                    current_field = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let botnet_victims = botnet_victims.ok_or_else(|| ReportParseError::TableNotFound {
        name: BOTNET_VICTIMS_TABLE.to_string(),
    })?;
    let top_users = top_users.ok_or_else(|| ReportParseError::TableNotFound {
        name: TOP_USERS_TABLE.to_string(),
    })?;

    Ok(ReportData {
        botnet_victims,
        top_users,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const SAMPLE_REPORT: &str = r#"<FortiAnalyzer_Report>
  <table name="Botnet Victims">
    <id value="1">
      <Victim_IP>10.0.0.5</Victim_IP>
      <Botnet_Name> Mirai </Botnet_Name>
      <Events>12</Events>
    </id>
    <id value="2">
      <Victim_IP>10.0.0.9</Victim_IP>
      <Botnet_Name>Zeus</Botnet_Name>
      <Events>3</Events>
    </id>
  </table>
  <table name="Some Other Table">
    <id value="9">
      <Noise>ignored</Noise>
    </id>
  </table>
  <table name="Top 20 Users by Bandwidth (exclude servers)">
    <id value="1">
      <User__or_IP_>somchai.p</User__or_IP_>
      <Bandwidth>5368709120</Bandwidth>
    </id>
    <id value="2">
      <User__or_IP_>10.1.2.3</User__or_IP_>
      <Bandwidth>1073741824</Bandwidth>
    </id>
  </table>
</FortiAnalyzer_Report>"#;

    #[test]
    fn clean_truncates_trailing_bytes() {
        let raw = format!("<a/>{CLOSING_TAG}\r\ngarbage after the report");
        let cleaned = clean_report_xml(&raw);
        assert_eq!(cleaned, format!("<a/>{CLOSING_TAG}\r\n"));
    }

    #[test]
    fn clean_without_closing_tag_is_identity() {
        let raw = "<partial><report>";
        assert_eq!(clean_report_xml(raw), raw);
    }

    #[test]
    fn parses_both_tables_in_document_order() {
        let data = parse_report(SAMPLE_REPORT).unwrap();

        assert_eq!(data.botnet_victims.len(), 2);
        assert_eq!(data.botnet_victims[0].value, "1");
        assert_eq!(data.botnet_victims[0].field("Victim_IP"), Some("10.0.0.5"));
        // Leading/trailing whitespace in field text is trimmed.
        assert_eq!(data.botnet_victims[0].field("Botnet_Name"), Some("Mirai"));
        assert_eq!(data.botnet_victims[1].field("Events"), Some("3"));

        assert_eq!(data.top_users.len(), 2);
        assert_eq!(data.top_users[0].field("User__or_IP_"), Some("somchai.p"));
        assert_eq!(data.top_users[1].field("Bandwidth"), Some("1073741824"));

        // Field order mirrors the document.
        let keys: Vec<&String> = data.top_users[0].fields.keys().collect();
        assert_eq!(keys, ["User__or_IP_", "Bandwidth"]);
    }

    #[test]
    fn unrelated_tables_are_ignored() {
        let data = parse_report(SAMPLE_REPORT).unwrap();
        for record in data.botnet_victims.iter().chain(&data.top_users) {
            assert_eq!(record.field("Noise"), None);
        }
    }

    #[test]
    fn missing_table_is_an_error() {
        let xml = r#"<FortiAnalyzer_Report>
          <table name="Botnet Victims"><id value="1"><Victim_IP>x</Victim_IP></id></table>
        </FortiAnalyzer_Report>"#;
        match parse_report(xml).unwrap_err() {
            ReportParseError::TableNotFound { name } => assert_eq!(name, TOP_USERS_TABLE),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_table_is_present_but_empty() {
        let xml = format!(
            r#"<FortiAnalyzer_Report>
              <table name="{BOTNET_VICTIMS_TABLE}"></table>
              <table name="{TOP_USERS_TABLE}"><id value="1"><Bandwidth>10</Bandwidth></id></table>
            </FortiAnalyzer_Report>"#
        );
        let data = parse_report(&xml).unwrap();
        assert!(data.botnet_victims.is_empty());
        assert_eq!(data.top_users.len(), 1);
    }

    #[test]
    fn self_closing_empty_table_counts_as_present() {
        let xml = format!(
            r#"<FortiAnalyzer_Report>
              <table name="{BOTNET_VICTIMS_TABLE}"/>
              <table name="{TOP_USERS_TABLE}"><id value="1"><Bandwidth>10</Bandwidth></id></table>
            </FortiAnalyzer_Report>"#
        );
        let data = parse_report(&xml).unwrap();
        assert!(data.botnet_victims.is_empty());
        assert_eq!(data.top_users.len(), 1);
    }

    #[test]
    fn self_closing_rows_and_fields_are_recorded() {
        let xml = format!(
            r#"<FortiAnalyzer_Report>
              <table name="{BOTNET_VICTIMS_TABLE}">
                <id value="1"/>
                <id value="2"><Victim_IP>10.0.0.9</Victim_IP><Events/></id>
              </table>
              <table name="{TOP_USERS_TABLE}"/>
            </FortiAnalyzer_Report>"#
        );
        let data = parse_report(&xml).unwrap();
        assert_eq!(data.botnet_victims.len(), 2);
        assert_eq!(data.botnet_victims[0].value, "1");
        assert!(data.botnet_victims[0].fields.is_empty());
        assert_eq!(data.botnet_victims[1].field("Events"), Some(""));
        assert!(data.top_users.is_empty());
    }

    #[test]
    fn record_without_value_attribute_is_an_error() {
        let xml = format!(
            r#"<FortiAnalyzer_Report>
              <table name="{BOTNET_VICTIMS_TABLE}"><id><Victim_IP>x</Victim_IP></id></table>
            </FortiAnalyzer_Report>"#
        );
        assert!(matches!(
            parse_report(&xml).unwrap_err(),
            ReportParseError::MissingValue { .. }
        ));
    }

    #[test]
    fn cleaned_then_parsed_round_trip() {
        let raw = format!("{SAMPLE_REPORT}\r\n-- appliance footer --");
        let data = parse_report(clean_report_xml(&raw)).unwrap();
        assert_eq!(data.top_users.len(), 2);
    }
}
