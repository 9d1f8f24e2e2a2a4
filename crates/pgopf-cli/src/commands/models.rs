use anyhow::Result;
use pgopf_nn::ModelKind;

pub fn handle() -> Result<()> {
    for id in ModelKind::available() {
        println!("{id}");
    }
    Ok(())
}
