fn main() -> anyhow::Result<()> {
    focusai_lib::run()
}
