#[cfg(test)]
mod tests {
    use crate::config::{BackboneVariant, DualRetinaNetConfig, HeadConfig, RetinaNetConfig};
    use crate::error::RetinaNetError;

    #[test]
    fn accepted_backbone_names() {
        for name in ["resnet50", "resnet101", "resnet152"] {
            assert!(BackboneVariant::from_name(name).is_ok());
        }
    }

    #[test]
    fn suffixed_backbone_names_are_accepted() {
        assert_eq!(
            BackboneVariant::from_name("resnet50_quantized").unwrap(),
            BackboneVariant::Resnet50
        );
        assert_eq!(
            BackboneVariant::from_name("resnet101_v2").unwrap(),
            BackboneVariant::Resnet101
        );
        assert_eq!(
            BackboneVariant::from_name("resnet152_finetune").unwrap(),
            BackboneVariant::Resnet152
        );
    }

    #[test]
    fn unknown_backbone_names_are_rejected() {
        for name in ["resnet34", "resnet", "vgg16", "", "50_resnet", "resnet500"] {
            match BackboneVariant::from_name(name) {
                Err(RetinaNetError::InvalidBackbone { name: rejected, allowed }) => {
                    assert_eq!(rejected, name);
                    assert!(allowed.contains("resnet50"));
                }
                other => panic!("expected InvalidBackbone for {name:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn depths_map_to_distinct_weight_resources() {
        let fifty = BackboneVariant::Resnet50.weights();
        let hundred_one = BackboneVariant::Resnet101.weights();
        let hundred_fifty_two = BackboneVariant::Resnet152.weights();

        assert_eq!(BackboneVariant::Resnet50.depth(), 50);
        assert_eq!(BackboneVariant::Resnet101.depth(), 101);
        assert_eq!(BackboneVariant::Resnet152.depth(), 152);

        assert_ne!(fifty.filename, hundred_one.filename);
        assert_ne!(hundred_one.filename, hundred_fifty_two.filename);
        assert_ne!(fifty.md5, hundred_one.md5);
        assert_ne!(hundred_one.md5, hundred_fifty_two.md5);
    }

    #[test]
    fn backbone_builder_disables_head_and_freezes_norms() {
        let config = BackboneVariant::Resnet101.backbone_config(4);
        assert_eq!(config.in_channels, 4);
        assert_eq!(config.num_classes, None);
        assert!(config.freeze_norm);
        assert_eq!(config.blocks, [3, 4, 23, 3]);
    }

    #[test]
    fn head_config_is_validated() {
        let config = RetinaNetConfig::resnet50(10).with_head(HeadConfig::new().with_num_anchors(0));
        assert!(matches!(
            config.validate(),
            Err(RetinaNetError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn dual_config_validates_both_streams() {
        let config = DualRetinaNetConfig::new(3)
            .with_input_b(crate::config::InputConfig::new().with_channels(0));
        match config.validate() {
            Err(RetinaNetError::InvalidConfiguration { reason }) => {
                assert!(reason.contains("input_b"));
            }
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }
}
