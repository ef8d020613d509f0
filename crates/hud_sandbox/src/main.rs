//! Headless walkthrough of the Prism UI stack.
//!
//! Boots the manager from the settings file, adds a local player, binds a
//! HUD slot to the extension registry, activates a feature action that
//! contributes widgets, and streams a menu onto a layer with input
//! suspended - the whole pipeline, minus an actual screen.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ui_extension_system::{
    base_widget_class, create_ui_extension_system, ExtensionPointMatch, ExtensionPointSlot,
    LocalPlayer, NullWidgetHost, UiTag, WidgetClass,
};
use ui_layout::{
    ActivatableWidgetStack, AsyncWidgetLayerState, DeferredAssetLoader, InputSuspendController,
    SoftClassRef,
};
use ui_manager::{
    functions, AddWidgetsAction, FeatureAction, FeatureContext, LayoutEntry, NullViewportSink,
    PolicyConfig, SlotEntry, UiManager, UiPolicy, UiSettings,
};

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_file(false).with_line_number(false))
        .init();
}

fn parse_tag(raw: &str) -> UiTag {
    match UiTag::parse(raw) {
        Ok(tag) => tag,
        Err(err) => {
            // The sandbox's tags are literals; a parse failure is a typo here.
            panic!("sandbox tag {raw:?} is malformed: {err}");
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logging();

    let settings = match UiSettings::load_from_file(Path::new("ui_settings.toml")) {
        Ok(settings) => settings,
        Err(err) => {
            error!("Falling back to default UI settings: {}", err);
            UiSettings::default()
        }
    };

    // Consumed capabilities: a widget host with no renderer, an explicit
    // input-suspension controller, a host-pumped loader, and a viewport
    // with no screen behind it.
    let host = NullWidgetHost::new();
    let input = Arc::new(InputSuspendController::new());
    let loader = DeferredAssetLoader::new();

    // The class table a real game builds from its asset registry.
    let layout_class = WidgetClass::subclass_of("OverlayLayout", &base_widget_class());
    let menu_class = WidgetClass::subclass_of("PauseMenu", &base_widget_class());
    let menu_ref = SoftClassRef::new("/Game/UI/W_PauseMenu");
    loader.register_class(&menu_ref, menu_class);

    // Manager and policy.
    let policy = UiPolicy::new(
        PolicyConfig::from_settings(&settings, layout_class),
        host.clone(),
        input.clone(),
        loader.clone(),
        NullViewportSink::new(),
    );
    let manager = UiManager::global();
    manager.initialize(policy);

    // One local player joins; the policy creates their root layout.
    let player = LocalPlayer::new(0, true);
    manager.notify_player_added(&player);

    let Some(layout) = functions::get_ui_layout(&manager, player.id()) else {
        error!("No root layout was created for the player; aborting");
        return;
    };

    let hud_layer = parse_tag("UI.Layer.HUD");
    let menu_layer = parse_tag("UI.Layer.Menu");
    layout.register_layer(
        hud_layer.clone(),
        ActivatableWidgetStack::new(host.clone(), Some(player.id())),
    );
    layout.register_layer(
        menu_layer.clone(),
        ActivatableWidgetStack::new(host.clone(), Some(player.id())),
    );

    // A HUD slot subscribes to the extension registry.
    let extension_system = create_ui_extension_system();
    let score_slot_tag = parse_tag("HUD.Slot.Score");
    let mut score_slot =
        ExtensionPointSlot::new(Some(score_slot_tag.clone()), ExtensionPointMatch::ExactMatch);
    score_slot.bind(&extension_system, host.clone(), &player);

    // A game feature contributes a HUD layout and a score widget.
    let context = FeatureContext {
        extension_system: extension_system.clone(),
        manager: manager.clone(),
    };
    let mut feature = AddWidgetsAction::new(
        vec![LayoutEntry {
            layer: hud_layer.clone(),
            layout_class: WidgetClass::subclass_of("HudLayout", &base_widget_class()),
        }],
        vec![SlotEntry {
            slot: score_slot_tag,
            widget_class: WidgetClass::subclass_of("ScoreWidget", &base_widget_class()),
        }],
    );
    if let Err(err) = feature.on_activate(&context).await {
        error!("Feature activation failed: {}", err);
        return;
    }
    info!(
        "Feature active: slot entries = {}, registered extensions = {}",
        score_slot.entry_count(),
        extension_system.extension_count(),
    );

    // Stream the pause menu onto its layer; input stays suspended until the
    // load lands.
    let handle = layout.push_widget_to_layer_async(menu_layer.clone(), true, &menu_ref, |state, widget| {
        match state {
            AsyncWidgetLayerState::Initialize => info!("Menu widget created, not yet attached"),
            AsyncWidgetLayerState::AfterPush => info!(
                "Menu pushed: {}",
                widget.map_or("<none>".to_string(), |w| w.class().name().to_string())
            ),
            AsyncWidgetLayerState::Canceled => info!("Menu push cancelled"),
        }
    });
    info!(
        "Streaming menu; input suspended = {}",
        input.is_input_suspended(player.id())
    );

    // Stand in for the per-frame streaming tick.
    tokio::time::sleep(Duration::from_millis(50)).await;
    loader.pump();

    info!(
        "Menu load completed = {}; input suspended = {}",
        handle.is_completed(),
        input.is_input_suspended(player.id())
    );

    if let Some(menu_stack) = layout.get_layer(&menu_layer) {
        info!("Menu layer holds {} widget(s)", menu_stack.widget_count());
    }
    info!("Host instantiated {} widget(s) in total", host.created_count());

    // Wind the feature back down and release the player.
    if let Err(err) = feature.on_deactivate(&context).await {
        error!("Feature deactivation failed: {}", err);
    }
    info!(
        "Feature inactive: slot entries = {}, registered extensions = {}",
        score_slot.entry_count(),
        extension_system.extension_count(),
    );

    score_slot.reset();
    manager.notify_player_destroyed(&player);
    manager.shutdown();

    info!("Sandbox run complete");
}
