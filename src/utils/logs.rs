use console::{measure_text_width, Style};

use crate::db::ObservedAnomaly;
use crate::scoring::{AnalysisOutcome, AnalysisReport, RankedMode};
use crate::settings::settings;

pub const TREE_BRANCH: char = '\u{251C}';
pub const TREE_END: char = '\u{2514}';
pub const TREE_HORIZ: char = '\u{2500}';
pub const TREE_VERT: char = '\u{2502}';

const VALUE_COLUMN: usize = 22;

fn tree_branch() -> String {
    dim()
        .apply_to(format!("{}{}{} ", TREE_BRANCH, TREE_HORIZ, TREE_HORIZ))
        .to_string()
}

fn tree_end() -> String {
    dim()
        .apply_to(format!("{}{}{} ", TREE_END, TREE_HORIZ, TREE_HORIZ))
        .to_string()
}

fn tree_indent() -> String {
    dim().apply_to(format!("{}   ", TREE_VERT)).to_string()
}

pub fn dim() -> Style {
    Style::new().dim()
}

fn cyan() -> Style {
    Style::new().cyan()
}

fn green() -> Style {
    Style::new().green()
}

fn red() -> Style {
    Style::new().red()
}

fn yellow() -> Style {
    Style::new().yellow()
}

fn bold() -> Style {
    Style::new().bold()
}

fn init_prefix() -> String {
    Style::new().blue().apply_to("[INIT]").to_string()
}

fn pad_label(label: &str) -> String {
    let current_width = measure_text_width(label);
    if current_width < VALUE_COLUMN {
        format!("{}{}", label, " ".repeat(VALUE_COLUMN - current_width))
    } else {
        format!("{} ", label)
    }
}

pub fn log_init(database_url: &str) {
    println!(
        "{} opening catalog at {}...",
        init_prefix(),
        cyan().apply_to(database_url)
    );
}

pub fn log_db_ready() {
    println!("{} catalog ready.", init_prefix());
}

pub fn log_seed_done() {
    println!("{} default vocabularies in place.", init_prefix());
}

pub fn log_error(message: &str) {
    eprintln!("{} {}", red().apply_to("[ERROR]"), message);
}

pub fn log_dam_selected(user_id: i32, dam_name: &str) {
    println!(
        "{} {} is now under analysis for user {}",
        green().apply_to("selected"),
        bold().apply_to(dam_name),
        dim().apply_to(user_id)
    );
}

fn probability_bar(pct: f32) -> String {
    let width = settings().report.bar_width;
    let filled = ((pct / 100.0) * width as f32).round() as usize;
    let filled = filled.min(width);
    format!(
        "{}{}",
        green().apply_to("\u{2588}".repeat(filled)),
        dim().apply_to("\u{2591}".repeat(width - filled))
    )
}

pub fn print_report(report: &AnalysisReport) {
    println!(
        "{} {} {}",
        Style::new().magenta().apply_to(bold().apply_to("[ANALYSIS]")),
        bold().apply_to(&report.dam_name),
        dim().apply_to(format!("({})", report.dam_type_name))
    );
    println!(
        "{}{} {}",
        tree_branch(),
        pad_label("observations"),
        bold().apply_to(report.observation_count)
    );
    println!(
        "{}{} {}",
        tree_branch(),
        pad_label("candidate modes"),
        bold().apply_to(report.candidate_count)
    );

    match &report.outcome {
        AnalysisOutcome::InsufficientData => {
            println!(
                "{}{} {}",
                tree_end(),
                pad_label("result"),
                yellow().apply_to("record at least one observed anomaly first")
            );
        }
        AnalysisOutcome::NoCandidates => {
            println!(
                "{}{} {}",
                tree_end(),
                pad_label("result"),
                yellow().apply_to("no failure mode is registered for this dam type")
            );
        }
        AnalysisOutcome::NoMatch => {
            println!(
                "{}{} {}",
                tree_end(),
                pad_label("result"),
                yellow().apply_to("no failure mode satisfied the match criteria")
            );
        }
        AnalysisOutcome::Ranked(ranked) => {
            println!(
                "{}{} {}",
                tree_end(),
                pad_label("result"),
                green().apply_to(format!("{} failure mode(s) ranked", ranked.len()))
            );
            println!();
            for mode in ranked {
                print_ranked_mode(mode);
            }
        }
    }
}

fn print_ranked_mode(mode: &RankedMode) {
    println!(
        "{} {} {}  {}",
        probability_bar(mode.probability_pct),
        bold().apply_to(format!("{:5.1}%", mode.probability_pct)),
        bold().apply_to(&mode.candidate.name),
        dim().apply_to(format!("score {:.2}", mode.score))
    );
    if let Some(description) = &mode.candidate.description {
        println!("{}{}", tree_indent(), dim().apply_to(description));
    }

    let max = settings().report.max_contributions;
    let shown = mode.contributions.len().min(max);
    for (i, contribution) in mode.contributions.iter().take(max).enumerate() {
        let branch = if i == shown - 1 && mode.contributions.len() <= max {
            tree_end()
        } else {
            tree_branch()
        };
        println!(
            "{}{} {} {} {}",
            branch,
            cyan().apply_to(&contribution.observed_name),
            dim().apply_to(format!(
                "[{} / {}]",
                contribution.zone_name, contribution.material_name
            )),
            dim().apply_to(format!("weight {:.2}", contribution.weight)),
            green().apply_to(format!("+{:.2}", contribution.amount))
        );
    }
    if mode.contributions.len() > max {
        println!(
            "{}{}",
            tree_end(),
            dim().apply_to(format!("... {} more", mode.contributions.len() - max))
        );
    }
    println!();
}

pub fn print_observations(dam_name: &str, rows: &[(ObservedAnomaly, String, String, String)]) {
    println!(
        "{} {} {}",
        Style::new().magenta().apply_to(bold().apply_to("[OBSERVATIONS]")),
        bold().apply_to(dam_name),
        dim().apply_to(format!("({} recorded)", rows.len()))
    );
    let count = rows.len();
    for (i, (observation, anomaly_name, zone_name, material_name)) in rows.iter().enumerate() {
        let branch = if i == count - 1 { tree_end() } else { tree_branch() };
        let sources = observation
            .detection_sources()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{}{} {} {} {}",
            branch,
            dim().apply_to(observation.observed_on),
            cyan().apply_to(anomaly_name),
            dim().apply_to(format!("[{} / {}]", zone_name, material_name)),
            yellow().apply_to(format!("via {sources}"))
        );
        if let Some(description) = &observation.description {
            println!("{}{}", tree_indent(), dim().apply_to(description));
        }
    }
}
