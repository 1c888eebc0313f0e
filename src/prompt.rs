//! Interactive option gathering.
//!
//! Each question shows its current default; an empty answer keeps it and an
//! answer that does not parse asks again.

use anyhow::{Context, Result};
use console::{style, Term};

use crate::cli::parse_sizes;
use crate::image_processing::ExportSpec;
use crate::utils::warn_println;

const YES_ANSWERS: [&str; 4] = ["y", "yes", "t", "true"];

/// Case-insensitive yes check; anything else is a no
pub fn is_yes(input: &str) -> bool {
    let input = input.trim();
    YES_ANSWERS.iter().any(|yes| input.eq_ignore_ascii_case(yes))
}

/// Source of answers, so prompting can run against something other than a terminal
pub trait AnswerSource {
    fn read_answer(&mut self) -> Result<String>;
}

impl AnswerSource for Term {
    fn read_answer(&mut self) -> Result<String> {
        self.read_line().context("Failed to read answer from terminal")
    }
}

fn ask<T, S, F>(source: &mut S, question: &str, default: T, parse: F) -> Result<T>
where
    S: AnswerSource,
    F: Fn(&str) -> Option<T>,
{
    loop {
        println!("{}", style(question).bold());
        let answer = source.read_answer()?;
        let answer = answer.trim();

        if answer.is_empty() {
            return Ok(default);
        }
        match parse(answer) {
            Some(value) => return Ok(value),
            None => warn_println("Invalid input"),
        }
    }
}

/// Ask for every export option, starting from `defaults`
pub fn prompt_export_spec<S: AnswerSource>(source: &mut S, defaults: &ExportSpec) -> Result<ExportSpec> {
    let scope = ask(
        source,
        &format!(
            "Enter scope, either classes or main (default [{}]):",
            defaults.scope
        ),
        defaults.scope.clone(),
        |input| Some(input.to_string()),
    )?;

    let export_size = ask(
        source,
        &format!("Enter export size (default [{}]):", defaults.export_size),
        defaults.export_size,
        |input| input.parse::<u32>().ok().filter(|&size| size > 0),
    )?;

    let trim = ask(
        source,
        &format!("Trim images? (default [{}]):", defaults.trim),
        defaults.trim,
        |input| Some(is_yes(input)),
    )?;

    let current_sizes = defaults
        .target_sizes
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let target_sizes = ask(
        source,
        &format!(
            "Enter sizes as a comma-separated list (default [{}]), enter 0 for none:",
            current_sizes
        ),
        defaults.target_sizes.clone(),
        |input| parse_sizes(input).ok(),
    )?;

    let square_output = if target_sizes.is_empty() {
        defaults.square_output
    } else {
        ask(
            source,
            &format!("Square images output? (default [{}]):", defaults.square_output),
            defaults.square_output,
            |input| Some(is_yes(input)),
        )?
    };

    Ok(ExportSpec {
        scope,
        export_size,
        trim,
        target_sizes,
        square_output,
    })
}
