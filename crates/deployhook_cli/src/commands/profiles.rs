//! Profiles command - List deployment profiles.

use anyhow::Result;

use deployhook_core::ProfileType;

pub async fn execute() -> Result<()> {
    println!("📦 Deployment profiles:");
    for profile_type in ProfileType::ALL {
        let profile = profile_type.profile();
        println!();
        println!("  {} - {}", profile_type, profile_type.description());
        for (i, step) in profile.steps.iter().enumerate() {
            println!("    {}. {:<20} {}", i + 1, step.name, step.forward);
            if let Some(compensation) = &step.compensation {
                println!("       {:<20} ↩ {}", "", compensation);
            }
        }
    }
    Ok(())
}
