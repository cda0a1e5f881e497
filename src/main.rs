// main.rs
// Demo binary: fits a two-layer perceptron to a small 1-D regression problem,
// running the full per-step lifecycle (forward, build, propagate_back,
// optimizer step, prune) once per sample.

use gradnet::{l2_loss, Activation, Adam, FeedForwardLayer, Graph, Optimizer, Result, Sequential, Tensor};

fn target_fn(x: f64) -> f64 {
    (2.0 * x - 1.0).tanh()
}

fn main() -> Result<()> {
    let mut graph = Graph::new();

    // All trainable leaves must exist before the first forward pass.
    let mut model = Sequential::new();
    model.add_layer(FeedForwardLayer::new(&mut graph, 8, 1, Activation::Tanh)?)?;
    model.add_layer(FeedForwardLayer::new(&mut graph, 1, 8, Activation::Identity)?)?;
    let params = model.parameters();
    println!(
        "training {} parameters across {} layers",
        model.num_params(),
        model.num_layers()
    );

    let samples: Vec<(f64, f64)> = (0..20)
        .map(|i| {
            let x = -1.0 + i as f64 * 0.1;
            (x, target_fn(x))
        })
        .collect();

    let mut adam = Adam::with_defaults(0.01);
    let epochs = 200;

    for epoch in 0..epochs {
        let mut epoch_loss = 0.0;
        for &(x, y) in &samples {
            let input = Tensor::from_vec(&mut graph, vec![x], 1, 1)?;
            let target = Tensor::from_vec(&mut graph, vec![y], 1, 1)?;

            let prediction = model.forward(&input, &mut graph)?;
            let loss = l2_loss(&prediction, &target, &mut graph)?;
            epoch_loss += graph.value(loss)?;

            graph.build(loss)?;
            graph.propagate_back(loss)?;
            adam.step(&mut graph, &params)?;
            graph.prune()?;
        }

        if epoch % 20 == 0 || epoch == epochs - 1 {
            println!(
                "epoch {epoch:3}: mean loss {:.6}",
                epoch_loss / samples.len() as f64
            );
        }
    }

    println!("\npredictions after training:");
    for &(x, y) in samples.iter().step_by(5) {
        let input = Tensor::from_vec(&mut graph, vec![x], 1, 1)?;
        let prediction = model.forward(&input, &mut graph)?;
        println!(
            "  f({x:5.2}) = {:8.5}   target {y:8.5}",
            prediction.value(&graph, 0, 0)?
        );
        // Inference allocates ephemeral nodes too; drop them before the next
        // forward pass.
        graph.prune()?;
    }

    Ok(())
}
