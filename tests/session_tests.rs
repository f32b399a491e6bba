use neoretro::{
    host_accept, run_client, run_host, GameConfig, HeuristicAgent, InMemoryLineChannel,
    TcpLineChannel,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[tokio::test(flavor = "multi_thread")]
async fn test_full_game_over_in_memory_channel() {
    let (mut host_chan, mut client_chan) = InMemoryLineChannel::pair();
    let config = GameConfig::enhanced(10, 10);
    let host_config = config.clone();

    let host = tokio::spawn(async move {
        let mut agent = HeuristicAgent::new();
        let mut rng = SmallRng::seed_from_u64(100);
        run_host(
            &mut host_chan,
            host_config,
            &mut agent,
            &mut rng,
            "Host",
            "Challenger",
        )
        .await
    });
    let client = tokio::spawn(async move {
        let mut agent = HeuristicAgent::new();
        let mut rng = SmallRng::seed_from_u64(200);
        run_client(
            &mut client_chan,
            config,
            &mut agent,
            &mut rng,
            "Host",
            "Challenger",
        )
        .await
    });

    let host_outcome = host.await.unwrap().unwrap();
    let client_outcome = client.await.unwrap().unwrap();

    // Both replicas agree on the result.
    assert_eq!(host_outcome.winner, client_outcome.winner);
    assert_eq!(host_outcome.turns, client_outcome.turns);
    assert!(host_outcome.turns > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_classic_game_over_in_memory_channel() {
    let (mut host_chan, mut client_chan) = InMemoryLineChannel::pair();

    let host = tokio::spawn(async move {
        let mut agent = HeuristicAgent::new();
        let mut rng = SmallRng::seed_from_u64(7);
        run_host(
            &mut host_chan,
            GameConfig::classic(10, 10),
            &mut agent,
            &mut rng,
            "Host",
            "Challenger",
        )
        .await
    });
    let client = tokio::spawn(async move {
        let mut agent = HeuristicAgent::new();
        let mut rng = SmallRng::seed_from_u64(8);
        run_client(
            &mut client_chan,
            GameConfig::classic(10, 10),
            &mut agent,
            &mut rng,
            "Host",
            "Challenger",
        )
        .await
    });

    let host_outcome = host.await.unwrap().unwrap();
    let client_outcome = client.await.unwrap().unwrap();
    assert_eq!(host_outcome.winner, client_outcome.winner);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_config_mismatch_aborts_the_session() {
    let (mut host_chan, mut client_chan) = InMemoryLineChannel::pair();

    let host = tokio::spawn(async move {
        let mut agent = HeuristicAgent::new();
        let mut rng = SmallRng::seed_from_u64(1);
        run_host(
            &mut host_chan,
            GameConfig::enhanced(10, 10),
            &mut agent,
            &mut rng,
            "Host",
            "Challenger",
        )
        .await
    });
    let client = tokio::spawn(async move {
        let mut agent = HeuristicAgent::new();
        let mut rng = SmallRng::seed_from_u64(2);
        run_client(
            &mut client_chan,
            GameConfig::classic(10, 10),
            &mut agent,
            &mut rng,
            "Host",
            "Challenger",
        )
        .await
    });

    let client_err = client.await.unwrap().unwrap_err();
    assert!(
        client_err.to_string().contains("configuration mismatch"),
        "unexpected error: {}",
        client_err
    );
    // The client hangs up, which is fatal for the host too.
    assert!(host.await.unwrap().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_full_game_over_tcp_with_readiness_gate() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (ready_tx, ready_rx) = oneshot::channel();

    let host = tokio::spawn(async move {
        let mut chan = host_accept(listener, ready_tx).await?;
        let mut agent = HeuristicAgent::new();
        let mut rng = SmallRng::seed_from_u64(300);
        run_host(
            &mut chan,
            GameConfig::classic(10, 10),
            &mut agent,
            &mut rng,
            "Host",
            "Challenger",
        )
        .await
    });

    // The readiness gate hands over the bound address before accept blocks.
    let addr = ready_rx.await.unwrap();
    let mut chan = TcpLineChannel::connect(addr).await.unwrap();
    let mut agent = HeuristicAgent::new();
    let mut rng = SmallRng::seed_from_u64(400);
    let client_outcome = run_client(
        &mut chan,
        GameConfig::classic(10, 10),
        &mut agent,
        &mut rng,
        "Host",
        "Challenger",
    )
    .await
    .unwrap();

    let host_outcome = host.await.unwrap().unwrap();
    assert_eq!(host_outcome.winner, client_outcome.winner);
    assert_eq!(host_outcome.turns, client_outcome.turns);
}
