//! Condition Balancing Example
//!
//! Demonstrates a run of participants through a three-condition catalog,
//! stratified on age group. Every participant is assigned, saved as kept,
//! and the group counts are printed.
//!
//! Run with: cargo run --example assign_participant

use condition_balancer::assignment::{Assignment, AssignmentConfig, ClassificationInfo, GroupSize};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Condition Balancer ===\n");

    let dir = std::env::temp_dir().join("condition_balancer_demo");
    std::fs::create_dir_all(&dir)?;
    let conditions = dir.join("conditions.csv");
    let sessions = dir.join("sessions.csv");

    // -------------------------------------------------------------------------
    // 1. Write a catalog and start from an empty session log
    // -------------------------------------------------------------------------
    println!("1. Writing catalog to {}", conditions.display());
    std::fs::write(
        &conditions,
        "list,soa\nlist_a.csv,100\nlist_b.csv,200\nlist_c.csv,300\n",
    )?;
    if sessions.exists() {
        std::fs::remove_file(&sessions)?;
    }

    let config = AssignmentConfig::builder()
        .conditions(&conditions)
        .sessions(&sessions)
        .group_size(GroupSize::Target(4))
        .build()?;

    // -------------------------------------------------------------------------
    // 2. Assign participants one after the other
    // -------------------------------------------------------------------------
    println!("\n2. Assigning participants...");
    let participants = [
        ("P01", "young"),
        ("P02", "young"),
        ("P03", "old"),
        ("P04", "young"),
        ("P05", "old"),
        ("P06", "young"),
    ];

    for (participant, age) in participants {
        let info = ClassificationInfo::new()
            .with("participant", participant)
            .with("date", "2024-03-01_10h00.00.000")
            .with("expName", "demo")
            .with("age", age);

        let mut assignment = Assignment::new(config.clone(), &info)?;
        println!(
            "   {participant} ({age}): condition {} -> {} (counts {:?})",
            assignment.condition(),
            assignment.get_field("list")?,
            assignment.counts()
        );
        assignment.finish()?;
    }

    // -------------------------------------------------------------------------
    // 3. Group occupancy
    // -------------------------------------------------------------------------
    println!("\n3. Group counts:");
    let info = ClassificationInfo::new()
        .with("participant", "P07")
        .with("age", "old");
    let assignment = Assignment::new(config, &info)?;
    print!("{}", assignment.summarize()?);

    println!("\n4. Session log:\n{}", std::fs::read_to_string(&sessions)?);
    Ok(())
}
