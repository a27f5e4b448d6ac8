//! get_time_info：本地日期时间（含星期名）

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use serde_json::Value;

use crate::tools::Tool;

/// 格式：Current system time: Sunday, 18 October 2026 - 14:30:00 (UTC+07:00)
pub fn format_time_info<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Current system time: {} (UTC{})",
        now.format("%A, %d %B %Y - %H:%M:%S"),
        now.format("%:z")
    )
}

pub struct TimeInfoTool;

#[async_trait]
impl Tool for TimeInfoTool {
    fn name(&self) -> &str {
        "get_time_info"
    }

    fn description(&self) -> &str {
        "Current local date, time and weekday. No args."
    }

    async fn execute(&self, _args: Value) -> Result<String, String> {
        Ok(format_time_info(&Local::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_format_with_weekday() {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let dt = tz.with_ymd_and_hms(2026, 1, 12, 14, 30, 0).unwrap();
        assert_eq!(
            format_time_info(&dt),
            "Current system time: Monday, 12 January 2026 - 14:30:00 (UTC+07:00)"
        );
    }
}
