use clap::Parser;

#[derive(Parser)]
#[command(version, about = "Decode proxy share links into Clash proxy nodes", long_about = None)]
pub struct Args {
    #[arg(short, long, help = "Input file with one link per line, stdin when omitted")]
    pub input: Option<String>,

    #[arg(short, long, help = "Output YAML path, stdout when omitted")]
    pub output: Option<String>,

    #[arg(short, long, help = "Emit debug log")]
    pub verbose: bool,
}
