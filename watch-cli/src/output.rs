use anyhow::Result;
#[cfg(feature = "colored-output")]
use colored::*;
use match_catalog::Sport;
use serde::Serialize;
use stream_failover::{HealthStatus, Match, RankedStream, SessionEvent, SlotView};

#[derive(Clone, Copy)]
enum Color {
    Green,
    Yellow,
    Red,
    Cyan,
    Dimmed,
}

/// Renders command results either as JSON or as colored text.
pub struct OutputManager {
    json: bool,
    colored: bool,
}

impl OutputManager {
    pub fn new(json: bool, colored: bool) -> Self {
        Self { json, colored }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn print_sports(&self, sports: &[Sport]) -> Result<()> {
        if self.json {
            return self.print_json(sports);
        }
        for sport in sports {
            println!(
                "{:<20} {}",
                self.colorize(&sport.id, Color::Cyan, false),
                sport.name
            );
        }
        Ok(())
    }

    pub fn print_matches(&self, matches: &[Match]) -> Result<()> {
        if self.json {
            return self.print_json(matches);
        }
        if matches.is_empty() {
            println!("{}", self.colorize("No matches found", Color::Yellow, false));
            return Ok(());
        }
        for m in matches {
            let live = if m.is_live {
                self.colorize("LIVE", Color::Red, true)
            } else {
                "    ".to_string()
            };
            let sources: Vec<&str> = m.sources.iter().map(|s| s.source.as_str()).collect();
            println!(
                "{} {:<14} {:<12} {} {}",
                live,
                self.colorize(&m.id, Color::Cyan, false),
                m.sport,
                m.title(),
                self.colorize(&format!("[{}]", sources.join(", ")), Color::Dimmed, false)
            );
        }
        Ok(())
    }

    pub fn print_ranked(&self, ranked: &[RankedStream]) -> Result<()> {
        if self.json {
            return self.print_json(ranked);
        }
        if ranked.is_empty() {
            println!("{}", self.colorize("No streams available", Color::Yellow, false));
            return Ok(());
        }
        for (index, entry) in ranked.iter().enumerate() {
            println!(
                "{:>2}. {} {} {}",
                index + 1,
                self.status_badge(entry.status),
                entry.stream,
                self.colorize(entry.stream.playable_url(), Color::Dimmed, false)
            );
        }
        Ok(())
    }

    pub fn print_slots(&self, slots: &[SlotView]) -> Result<()> {
        if self.json {
            return self.print_json(slots);
        }
        if slots.is_empty() {
            println!("{}", self.colorize("Session is empty", Color::Yellow, false));
            return Ok(());
        }
        for slot in slots {
            let flags = format!(
                "{}{}",
                if slot.focused { "*" } else { " " },
                if slot.muted { "m" } else { " " }
            );
            let selected = slot
                .selected
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{} {:<14} {} {} ({} candidates)",
                flags,
                self.colorize(&slot.match_info.id, Color::Cyan, false),
                self.status_badge(slot.status),
                selected,
                slot.candidates
            );
        }
        Ok(())
    }

    pub fn print_event(&self, event: &SessionEvent) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }
        let color = match event {
            SessionEvent::FailedOver { .. } => Color::Yellow,
            SessionEvent::Exhausted { .. } => Color::Red,
            SessionEvent::EndpointRecovered { .. } => Color::Green,
            _ => Color::Cyan,
        };
        println!(
            "{} {}",
            self.colorize(
                &event.timestamp().format("%H:%M:%S").to_string(),
                Color::Dimmed,
                false
            ),
            self.colorize(&event.description(), color, false)
        );
        Ok(())
    }

    fn status_badge(&self, status: HealthStatus) -> String {
        let color = match status {
            HealthStatus::Working => Color::Green,
            HealthStatus::Unstable => Color::Yellow,
            HealthStatus::Offline => Color::Red,
            HealthStatus::Unknown => Color::Dimmed,
        };
        self.colorize(&format!("{:<8}", status.as_str()), color, true)
    }

    fn colorize(&self, text: &str, color: Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Red => text.red(),
                    Color::Cyan => text.cyan(),
                    Color::Dimmed => text.dimmed(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (color, bold, self.colored);
            text.to_string()
        }
    }
}
