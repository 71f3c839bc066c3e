pub fn run() -> anyhow::Result<()> {
    println!("termtree {}", env!("CARGO_PKG_VERSION"));
    println!("snapshot format v{}", termtree_engine::SNAPSHOT_VERSION);
    Ok(())
}
