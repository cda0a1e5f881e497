#[cfg(test)]
mod tests {
    use crate::error::GradnetError;
    use crate::graph::Graph;
    use crate::nn::{l1_loss, l2_loss, Activation, FeedForwardLayer, Sequential};
    use crate::tensor::Tensor;
    use approx::assert_relative_eq;

    fn single_unit_layer(g: &mut Graph) -> FeedForwardLayer {
        // One output unit over four inputs, unit weights, zero bias.
        FeedForwardLayer::with_parameters(
            g,
            vec![1.0, 1.0, 1.0, 1.0],
            vec![0.0],
            1,
            4,
            Activation::Identity,
        )
        .unwrap()
    }

    #[test]
    fn forward_computes_affine_map() {
        let mut g = Graph::new();
        let layer = single_unit_layer(&mut g);
        let x = Tensor::from_vec(&mut g, vec![1.0, 2.5, 6.0, 4.0], 4, 1).unwrap();

        let out = layer.forward(&x, &mut g).unwrap();
        assert_eq!(out.shape(), (1, 1));
        assert_relative_eq!(out.value(&g, 0, 0).unwrap(), 13.5);
    }

    #[test]
    fn single_layer_regression_end_to_end() {
        let mut g = Graph::new();
        let layer = single_unit_layer(&mut g);
        let x = Tensor::from_vec(&mut g, vec![1.0, 2.5, 6.0, 4.0], 4, 1).unwrap();
        let target = Tensor::from_vec(&mut g, vec![10.0], 1, 1).unwrap();

        let out = layer.forward(&x, &mut g).unwrap();
        let loss = l2_loss(&out, &target, &mut g).unwrap();
        assert_relative_eq!(g.value(loss).unwrap(), 12.25);

        g.build(loss).unwrap();
        g.propagate_back(loss).unwrap();

        // d(loss)/d(out) = 2 * (13.5 - 10) = 7, reaching out through both
        // factors of the square.
        assert_relative_eq!(g.grad(out.node(0, 0)).unwrap(), 7.0);

        // d(loss)/d(w_i) = 7 * x_i, d(loss)/d(b) = 7.
        let w = layer.weights();
        let expected = [7.0, 17.5, 42.0, 28.0];
        for (i, &e) in expected.iter().enumerate() {
            assert_relative_eq!(w.grad(&g, 0, i).unwrap(), e);
        }
        assert_relative_eq!(layer.biases().grad(&g, 0, 0).unwrap(), 7.0);
    }

    #[test]
    fn forward_rejects_wrong_input_width() {
        let mut g = Graph::new();
        let layer = single_unit_layer(&mut g);
        let x = Tensor::from_vec(&mut g, vec![1.0, 2.0], 2, 1).unwrap();
        assert!(matches!(
            layer.forward(&x, &mut g).unwrap_err(),
            GradnetError::ShapeMismatch { .. }
        ));
    }

    #[test]
    fn relu_layer_clamps_negative_preactivations() {
        let mut g = Graph::new();
        let layer = FeedForwardLayer::with_parameters(
            &mut g,
            vec![1.0, -1.0],
            vec![0.0, 0.0],
            2,
            1,
            Activation::Relu,
        )
        .unwrap();
        let x = Tensor::from_vec(&mut g, vec![3.0], 1, 1).unwrap();
        let out = layer.forward(&x, &mut g).unwrap();
        assert_relative_eq!(out.value(&g, 0, 0).unwrap(), 3.0);
        assert_relative_eq!(out.value(&g, 1, 0).unwrap(), 0.0);
    }

    #[test]
    fn layer_parameters_are_trainable_and_counted() {
        let mut g = Graph::new();
        let layer = FeedForwardLayer::new(&mut g, 3, 5, Activation::Tanh).unwrap();
        assert_eq!(layer.num_params(), 3 * 5 + 3);
        let params = layer.parameters();
        assert_eq!(params.len(), layer.num_params());
        for id in params {
            assert!(g.is_trainable(id).unwrap());
        }
        assert_eq!(g.num_trainable(), layer.num_params());
    }

    #[test]
    fn sequential_chains_layers() {
        let mut g = Graph::new();
        let mut model = Sequential::new();
        model
            .add_layer(
                FeedForwardLayer::with_parameters(
                    &mut g,
                    vec![2.0, 0.0, 0.0, 2.0],
                    vec![1.0, 1.0],
                    2,
                    2,
                    Activation::Identity,
                )
                .unwrap(),
            )
            .unwrap();
        model
            .add_layer(
                FeedForwardLayer::with_parameters(
                    &mut g,
                    vec![1.0, 1.0],
                    vec![0.0],
                    1,
                    2,
                    Activation::Identity,
                )
                .unwrap(),
            )
            .unwrap();

        assert_eq!(model.num_layers(), 2);
        assert_eq!(model.num_params(), 6 + 3);
        assert_eq!(model.parameters().len(), model.num_params());

        let x = Tensor::from_vec(&mut g, vec![1.0, 2.0], 2, 1).unwrap();
        // Layer 1: (2*1 + 1, 2*2 + 1) = (3, 5); layer 2: 3 + 5 = 8.
        let out = model.forward(&x, &mut g).unwrap();
        assert_relative_eq!(out.value(&g, 0, 0).unwrap(), 8.0);
    }

    #[test]
    fn sequential_rejects_width_mismatch() {
        let mut g = Graph::new();
        let mut model = Sequential::new();
        model
            .add_layer(FeedForwardLayer::new(&mut g, 4, 2, Activation::Relu).unwrap())
            .unwrap();
        let narrow = FeedForwardLayer::new(&mut g, 1, 3, Activation::Identity).unwrap();
        assert!(matches!(
            model.add_layer(narrow).unwrap_err(),
            GradnetError::ShapeMismatch { .. }
        ));
    }

    #[test]
    fn l2_loss_requires_matching_column_vectors() {
        let mut g = Graph::new();
        let a = Tensor::zeros(&mut g, 3, 1);
        let b = Tensor::zeros(&mut g, 2, 1);
        assert!(l2_loss(&a, &b, &mut g).is_err());

        let wide = Tensor::zeros(&mut g, 2, 2);
        assert!(l2_loss(&wide, &wide.clone(), &mut g).is_err());
    }

    #[test]
    fn l1_loss_value_and_gradient_signs() {
        let mut g = Graph::new();
        let pred = Tensor::from_vec_trainable(&mut g, vec![1.0, -2.0], 2, 1).unwrap();
        let target = Tensor::from_vec(&mut g, vec![3.0, 0.0], 2, 1).unwrap();

        let loss = l1_loss(&pred, &target, &mut g).unwrap();
        assert_relative_eq!(g.value(loss).unwrap(), 4.0);

        g.build(loss).unwrap();
        g.propagate_back(loss).unwrap();
        // Both residuals are negative, so both subgradients are -1.
        assert_relative_eq!(pred.grad(&g, 0, 0).unwrap(), -1.0);
        assert_relative_eq!(pred.grad(&g, 1, 0).unwrap(), -1.0);
    }
}
