//! The publishing-cadence reminder. It looks at the newest parseable article
//! date and decides whether a new article is due. It is meant to be run from
//! an external scheduler such as cron; see `perspective reminder check`.

use crate::article::{format_date, Article};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// A reminder is due once the newest article is this many days old.
pub const REMIND_AFTER_DAYS: i64 = 7;

/// How far back the newest date is assumed to be when no article date
/// parses.
const FALLBACK_WEEKS: i64 = 4;

/// Topic suggestions per category. Categories missing from the table get no
/// suggestions.
const IDEAS: &[(&str, &[&str])] = &[
    (
        "Networks",
        &[
            "The Future of 5G in Africa",
            "Building Resilient Internet Infrastructure",
            "Mesh Networks for Rural Connectivity",
            "The Role of Satellite Internet in Africa",
        ],
    ),
    (
        "Automotive",
        &[
            "Electric Vehicles in African Markets",
            "The Art of Vehicle Maintenance",
            "Off-Road Navigation Without GPS",
            "Sustainable Transportation Solutions",
        ],
    ),
    (
        "Aviation",
        &[
            "The Economics of Regional Aviation",
            "Weather Patterns and Flight Safety",
            "Drone Technology in Agriculture",
            "Airport Infrastructure Development",
        ],
    ),
    (
        "Linux",
        &[
            "Building Custom Linux Distributions",
            "Server Security Best Practices",
            "Open Source in Education",
            "Container Technology Explained",
        ],
    ),
    (
        "Python",
        &[
            "Machine Learning for Beginners",
            "Web Scraping Ethics and Techniques",
            "Building APIs with FastAPI",
            "Data Visualization Best Practices",
        ],
    ),
    (
        "Embedded",
        &[
            "IoT Security Fundamentals",
            "Low-Power Design Techniques",
            "Sensor Networks in Agriculture",
            "Real-Time Operating Systems",
        ],
    ),
];

const IDEAS_PER_CATEGORY: usize = 2;
const MAX_IDEAS: usize = 6;

/// A snapshot of the store as of `now`.
pub struct Reminder<'a> {
    articles: &'a [Article],
    now: NaiveDateTime,
}

impl<'a> Reminder<'a> {
    /// Takes a snapshot of `articles`. Articles whose date doesn't parse are
    /// logged here and left out of every date calculation.
    pub fn new(articles: &'a [Article], now: NaiveDateTime) -> Reminder<'a> {
        for a in articles.iter().filter(|a| a.parsed_date().is_none()) {
            log::warn!("article `{}` has an unparseable date {:?}", a.id, a.date);
        }
        Reminder { articles, now }
    }

    /// The newest article date that parses, or four weeks before now when
    /// none does.
    pub fn latest_date(&self) -> NaiveDateTime {
        self.articles
            .iter()
            .filter_map(Article::parsed_date)
            .max()
            .map(|date: NaiveDate| date.and_time(chrono::NaiveTime::MIN))
            .unwrap_or_else(|| self.now - Duration::weeks(FALLBACK_WEEKS))
    }

    /// Whole days between the newest article and now.
    pub fn days_since_last(&self) -> i64 {
        (self.now - self.latest_date()).num_days()
    }

    /// Whether a new article is due.
    pub fn should_remind(&self) -> bool {
        self.days_since_last() >= REMIND_AFTER_DAYS
    }

    /// Topic suggestions for the categories present in the store, at most
    /// two per category and six overall.
    pub fn ideas(&self) -> Vec<String> {
        let categories: BTreeSet<&str> =
            self.articles.iter().map(|a| a.category.as_str()).collect();
        categories
            .into_iter()
            .filter_map(|category| IDEAS.iter().find(|(name, _)| *name == category))
            .flat_map(|(name, ideas)| {
                ideas
                    .iter()
                    .take(IDEAS_PER_CATEGORY)
                    .map(move |idea| format!("{}: {}", name, idea))
            })
            .take(MAX_IDEAS)
            .collect()
    }

    fn status(&self) -> &'static str {
        match self.should_remind() {
            true => "Time for a new article!",
            false => "Blog is up to date",
        }
    }

    /// The short statistics block printed by `reminder stats`.
    pub fn stats(&self) -> String {
        let mut out = String::new();
        // Writing into a `String` can't fail.
        let _ = self.write_stats(&mut out);
        out
    }

    fn write_stats(&self, out: &mut String) -> std::fmt::Result {
        let status = match self.should_remind() {
            true => "Needs Update",
            false => "Current",
        };
        writeln!(out, "Blog Statistics:")?;
        writeln!(out, "  Total Articles: {}", self.articles.len())?;
        writeln!(out, "  Last Article: {}", format_date(self.latest_date().date()))?;
        writeln!(out, "  Days Since: {}", self.days_since_last())?;
        writeln!(out, "  Status: {}", status)
    }

    /// The full reminder, suitable for the console, the reminder log, or an
    /// email body.
    pub fn report(&self) -> String {
        let mut out = String::new();
        // Writing into a `String` can't fail.
        let _ = self.write_report(&mut out);
        out
    }

    fn write_report(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "# Weekly Blog Update Reminder")?;
        writeln!(out)?;
        writeln!(out, "## Blog Statistics")?;
        writeln!(out, "- Total Articles: {}", self.articles.len())?;
        writeln!(out, "- Last Article: {}", format_date(self.latest_date().date()))?;
        writeln!(out, "- Days Since Last Article: {}", self.days_since_last())?;
        writeln!(out)?;
        writeln!(out, "## Status")?;
        writeln!(out, "{}", self.status())?;
        writeln!(out)?;
        writeln!(out, "## Article Ideas")?;
        for idea in self.ideas() {
            writeln!(out, "- {}", idea)?;
        }
        writeln!(out)?;
        writeln!(out, "## Quick Commands")?;
        writeln!(out, "```bash")?;
        writeln!(out, "# Create new article")?;
        writeln!(out, "perspective article sample > new_article.json")?;
        writeln!(out)?;
        writeln!(out, "# List current articles")?;
        writeln!(out, "perspective article list")?;
        writeln!(out)?;
        writeln!(out, "# Add article after editing")?;
        writeln!(out, "perspective article add new_article.json")?;
        writeln!(out, "```")?;
        writeln!(out)?;
        writeln!(out, "## Article Template")?;
        writeln!(out, "Remember to follow the established style:")?;
        writeln!(out, "- Personal perspective and experience")?;
        writeln!(out, "- Technical depth with practical examples")?;
        writeln!(out, "- Connection to African context where relevant")?;
        writeln!(out, "- \"Anti-bloat\" philosophy")?;
        writeln!(out, "- Clear, engaging writing")?;
        writeln!(out)?;
        writeln!(out, "---")?;
        writeln!(out, "Generated on {}", self.now.format("%B %d, %Y at %I:%M %p"))
    }

    /// Appends the report to `path`, framed by a timestamped banner.
    pub fn log_report(&self, path: &Path) -> io::Result<()> {
        let rule = "=".repeat(50);
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        write!(
            file,
            "\n{rule}\nREMINDER: {}\n{rule}\n{}\n{rule}\n\n",
            self.now.format("%Y-%m-%d %H:%M:%S"),
            self.report(),
            rule = rule,
        )?;
        log::info!("reminder logged to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::article::test::article;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 20)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_should_remind_after_a_week() {
        let stale = vec![article("a", "Linux", "June 10, 2024")];
        let reminder = Reminder::new(&stale, now());
        assert_eq!(10, reminder.days_since_last());
        assert!(reminder.should_remind());

        let fresh = vec![
            article("a", "Linux", "June 10, 2024"),
            article("b", "Linux", "June 17, 2024"),
        ];
        let reminder = Reminder::new(&fresh, now());
        assert_eq!(3, reminder.days_since_last());
        assert!(!reminder.should_remind());
    }

    #[test]
    fn test_unparseable_dates_are_ignored() {
        let articles = vec![
            article("a", "Linux", "June 17, 2024"),
            article("b", "Linux", "next Tuesday"),
        ];
        let reminder = Reminder::new(&articles, now());
        assert_eq!(
            NaiveDate::from_ymd_opt(2024, 6, 17).unwrap(),
            reminder.latest_date().date()
        );
    }

    #[test]
    fn test_empty_store_falls_back_four_weeks() {
        let reminder = Reminder::new(&[], now());
        assert_eq!(28, reminder.days_since_last());
        assert!(reminder.should_remind());

        let undated = vec![article("a", "Linux", "")];
        assert_eq!(28, Reminder::new(&undated, now()).days_since_last());
    }

    #[test]
    fn test_ideas_follow_categories() {
        let articles = vec![
            article("a", "Networks", "June 17, 2024"),
            article("b", "Aviation", "June 17, 2024"),
            article("c", "Networks", "June 17, 2024"),
            article("d", "Cooking", "June 17, 2024"),
        ];
        let ideas = Reminder::new(&articles, now()).ideas();
        assert_eq!(
            vec![
                "Aviation: The Economics of Regional Aviation",
                "Aviation: Weather Patterns and Flight Safety",
                "Networks: The Future of 5G in Africa",
                "Networks: Building Resilient Internet Infrastructure",
            ],
            ideas
        );
    }

    #[test]
    fn test_report_and_log() {
        let articles = vec![article("a", "Linux", "June 10, 2024")];
        let reminder = Reminder::new(&articles, now());
        let report = reminder.report();
        assert!(report.contains("- Total Articles: 1"));
        assert!(report.contains("- Last Article: June 10, 2024"));
        assert!(report.contains("- Days Since Last Article: 10"));
        assert!(report.contains("Time for a new article!"));
        assert!(report.contains("- Linux: Building Custom Linux Distributions"));
        assert!(report.contains("Generated on June 20, 2024 at 09:30 AM"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.log");
        reminder.log_report(&path).unwrap();
        reminder.log_report(&path).unwrap();
        let logged = std::fs::read_to_string(&path).unwrap();
        assert_eq!(2, logged.matches("REMINDER: 2024-06-20 09:30:00").count());
    }

    #[test]
    fn test_stats() {
        let articles = vec![article("a", "Linux", "June 17, 2024")];
        let stats = Reminder::new(&articles, now()).stats();
        assert!(stats.contains("Total Articles: 1"));
        assert!(stats.contains("Days Since: 3"));
        assert!(stats.contains("Status: Current"));
        assert_eq!(
            "Blog Statistics:\n  Total Articles: 1\n  Last Article: June 17, 2024\n  \
             Days Since: 3\n  Status: Current\n",
            stats
        );
    }
}
