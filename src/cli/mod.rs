//! CLI module for the rubric grader
//!
//! Provides subcommands:
//! - `grade`: grade a batch of items against a rubric

pub mod grade;

use clap::{Parser, Subcommand};

/// Rubric grader - Grades answers against a rubric with an LLM
#[derive(Parser)]
#[command(name = "rubric-grader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Grade a batch of items against a rubric
    Grade(grade::GradeArgs),
}
