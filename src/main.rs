#[tokio::main]
async fn main() {
    karaoke_booking::run().await;
}
