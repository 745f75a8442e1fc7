fn main() -> anyhow::Result<()> {
    env_logger::init();
    sierra_hub_lib::run()
}
