use clap::Args;
use commutewise_core::slots::generate;
use commutewise_core::TimeSlot;

#[derive(Args)]
pub struct SlotsArgs {
    /// First departure (HH:MM)
    #[arg(long)]
    start: TimeSlot,
    /// Last possible departure (HH:MM)
    #[arg(long)]
    end: TimeSlot,
    /// Minutes between departures
    #[arg(long, default_value_t = 15)]
    interval: u32,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: SlotsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let slots = generate(args.start, args.end, args.interval)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&slots)?);
        return Ok(());
    }
    for slot in &slots {
        println!("{slot}");
    }
    Ok(())
}
