use sapling_dom::{
	build, children, component,
	memory::{MemorySurface, NodeId},
	Component, Config, Error, Event, Node, Props, Runtime, Scope, SetState,
};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

mod memory_logging_;

fn setup() -> (MemorySurface, NodeId, Runtime<MemorySurface>) {
	setup_with(Config::default())
}

fn setup_with(config: Config) -> (MemorySurface, NodeId, Runtime<MemorySurface>) {
	memory_logging_::init();
	let surface = MemorySurface::new();
	let container = surface.create_container("main");
	let runtime = Runtime::with_config(surface.clone(), config);
	(surface, container, runtime)
}

fn mount(component: Component) -> Node {
	build(component, Props::new(), children![])
}

const PICKER_SIZE: f64 = 30.;

fn picker(scope: &mut Scope<'_>) -> Node {
	let (color, set_color) = scope.use_state(String::from("black"));
	let (left, set_left) = scope.use_state(0.);
	let (top, set_top) = scope.use_state(0.);

	build(
		"div",
		Props::new().with("className", "picker").on("mousemove", move |event| {
			set_left.set(event.client_x() - PICKER_SIZE);
			set_top.set(event.client_y() - PICKER_SIZE);
		}),
		children![
			build(
				"div",
				Props::new()
					.with("className", "picker-handle")
					.with("style", format!("top: {}px; left: {}px", top, left))
					.on("click", move |_| set_color.set(String::from("red"))),
				children![],
			),
			build("span", Props::new().with("className", "swatch"), children![color]),
		],
	)
}

#[test]
fn picker_follows_the_mouse() {
	let (surface, container, runtime) = setup();

	let mount = runtime.render(mount(component(picker)), &container).unwrap();
	let area = surface.children(container)[0];
	let handle = surface.children(area)[0];
	assert_eq!(surface.attribute(handle, "style").as_deref(), Some("top: 0px; left: 0px"));

	assert!(surface.dispatch(area, &Event::new("mousemove").with_client_position(40., 50.)));

	assert_eq!(surface.attribute(handle, "style").as_deref(), Some("top: 20px; left: 10px"));
	assert_eq!(mount.pass_count(), 2);

	assert!(surface.dispatch(handle, &Event::new("click")));
	assert_eq!(surface.text_content(area), "red");
	assert_eq!(surface.attribute(handle, "style").as_deref(), Some("top: 20px; left: 10px"));
	assert_eq!(mount.pass_count(), 3);
}

fn double_counter(scope: &mut Scope<'_>) -> Node {
	let (count, set_count) = scope.use_state(0);
	build(
		"button",
		Props::new().on("click", move |_| {
			set_count.update(|count| count + 1);
			set_count.update(|count| count + 1);
		}),
		children![count],
	)
}

#[test]
fn updates_in_one_handler_are_coalesced() {
	let (surface, container, runtime) = setup();

	let mount = runtime.render(mount(component(double_counter)), &container).unwrap();
	let button = surface.children(container)[0];
	surface.dispatch(button, &Event::new("click"));

	assert_eq!(surface.text_content(button), "2");
	assert_eq!(mount.pass_count(), 2);
}

fn capturing(setter: Rc<RefCell<Option<SetState<i32>>>>) -> Component {
	component(move |scope| {
		let (value, set_value) = scope.use_state(0);
		*setter.borrow_mut() = Some(set_value);
		build("output", Props::new(), children![value])
	})
}

#[test]
fn each_update_outside_handlers_renders() {
	let (surface, container, runtime) = setup();
	let setter = Rc::new(RefCell::new(None));

	let mount = runtime.render(mount(capturing(Rc::clone(&setter))), &container).unwrap();
	let set_value = setter.borrow().clone().unwrap();

	set_value.set(5);
	assert_eq!(mount.pass_count(), 2);
	assert_eq!(surface.to_html(container), "<main><output>5</output></main>");

	// Unchanged values render too.
	set_value.set(5);
	assert_eq!(mount.pass_count(), 3);
	assert!(mount.take_error().is_none());
}

fn other(_: &mut Scope<'_>) -> Node {
	build("output", Props::new(), children!["other"])
}

#[test]
fn state_survives_rerenders_of_the_same_kind() {
	let (surface, container, runtime) = setup();
	let setter = Rc::new(RefCell::new(None));

	runtime.render(mount(capturing(Rc::clone(&setter))), &container).unwrap();
	let set_value = setter.borrow().clone().unwrap();
	set_value.set(7);

	runtime.render(mount(capturing(Rc::clone(&setter))), &container).unwrap();
	assert_eq!(surface.to_html(container), "<main><output>7</output></main>");
}

#[test]
fn kind_change_discards_state() {
	let (surface, container, runtime) = setup();
	let setter = Rc::new(RefCell::new(None));

	runtime.render(mount(capturing(Rc::clone(&setter))), &container).unwrap();
	let old_setter = setter.borrow().clone().unwrap();
	old_setter.set(7);

	let mount_handle = runtime.render(mount(component(other)), &container).unwrap();
	let passes = mount_handle.pass_count();
	assert_eq!(surface.to_html(container), "<main><output>other</output></main>");

	old_setter.set(8);
	assert_eq!(mount_handle.pass_count(), passes);

	runtime.render(mount(capturing(Rc::clone(&setter))), &container).unwrap();
	assert_eq!(surface.to_html(container), "<main><output>0</output></main>");
}

#[test]
fn lazy_initial_value_is_computed_once() {
	let (surface, container, runtime) = setup();
	let calls = Rc::new(Cell::new(0));

	let lazy = {
		let calls = Rc::clone(&calls);
		component(move |scope| {
			let (count, set_count) = scope.use_state_with(|| {
				calls.set(calls.get() + 1);
				10
			});
			build("button", Props::new().on("click", move |_| set_count.update(|count| count + 1)), children![count])
		})
	};

	runtime.render(mount(lazy), &container).unwrap();
	let button = surface.children(container)[0];
	surface.dispatch(button, &Event::new("click"));
	surface.dispatch(button, &Event::new("click"));

	assert_eq!(surface.text_content(button), "12");
	assert_eq!(calls.get(), 1);
}

fn toggling(scope: &mut Scope<'_>) -> Node {
	let (extra, set_extra) = scope.use_state(false);
	if extra {
		scope.use_state(0);
	}
	build("button", Props::new().on("click", move |_| set_extra.set(true)), children![])
}

#[test]
fn more_hooks_than_the_first_render() {
	let (surface, container, runtime) = setup();

	let mount = runtime.render(mount(component(toggling)), &container).unwrap();
	let button = surface.children(container)[0];
	surface.dispatch(button, &Event::new("click"));

	match mount.take_error() {
		Some(Error::HookCount { expected: 1, found: 2, .. }) => (),
		other => panic!("Expected a hook count error, found {:?}", other),
	}
	assert!(mount.take_error().is_none());
	assert_eq!(mount.pass_count(), 1);
}

fn conditional(scope: &mut Scope<'_>) -> Node {
	let (first, _) = scope.use_state(1);
	let mut total = first;
	if scope.props().get_bool("both") == Some(true) {
		let (second, _) = scope.use_state(2);
		total += second;
	}
	build("output", Props::new(), children![total])
}

#[test]
fn fewer_hooks_than_the_first_render() {
	let (surface, container, runtime) = setup();

	runtime.render(build(component(conditional), Props::new().with("both", true), children![]), &container).unwrap();
	assert_eq!(surface.text_content(container), "3");

	let result = runtime.render(build(component(conditional), Props::new().with("both", false), children![]), &container);
	assert!(matches!(result, Err(Error::HookCount { expected: 2, found: 1, .. })));
}

fn shifting(scope: &mut Scope<'_>) -> Node {
	if scope.props().get_bool("text") == Some(true) {
		let (text, _) = scope.use_state(String::from("text"));
		build("output", Props::new(), children![text])
	} else {
		let (number, _) = scope.use_state(1);
		build("output", Props::new(), children![number])
	}
}

#[test]
fn hook_type_changes_are_detected() {
	let (_, container, runtime) = setup();

	runtime.render(build(component(shifting), Props::new(), children![]), &container).unwrap();
	let result = runtime.render(build(component(shifting), Props::new().with("text", true), children![]), &container);

	assert!(matches!(result, Err(Error::HookType { index: 0, .. })));
}

fn settling(scope: &mut Scope<'_>) -> Node {
	let (ready, set_ready) = scope.use_state(false);
	if !ready {
		set_ready.set(true);
	}
	build("p", Props::new(), children![if ready { "ready" } else { "loading" }])
}

#[test]
fn updates_during_render_run_a_follow_up_pass() {
	let (surface, container, runtime) = setup();

	let mount = runtime.render(mount(component(settling)), &container).unwrap();

	assert_eq!(surface.to_html(container), "<main><p>ready</p></main>");
	assert_eq!(mount.pass_count(), 2);
}

fn restless(scope: &mut Scope<'_>) -> Node {
	let (count, set_count) = scope.use_state(0_u64);
	set_count.set(count + 1);
	build("p", Props::new(), children![count])
}

#[test]
fn pass_limit_stops_endless_updates() {
	let (surface, container, runtime) = setup_with(Config::new().with_pass_limit(4));

	let result = runtime.render(mount(component(restless)), &container);

	assert!(matches!(result, Err(Error::PassLimit(4))));
	let mounts = runtime.mounts();
	assert_eq!(mounts.len(), 1);
	assert_eq!(mounts[0].pass_count(), 4);
	assert_eq!(surface.to_html(container), "<main><p>3</p></main>");
}

#[test]
fn whole_tree_rerenders_on_update() {
	let (surface, container, runtime) = setup();
	let parent_renders = Rc::new(Cell::new(0));

	let parent = {
		let parent_renders = Rc::clone(&parent_renders);
		component(move |_| {
			parent_renders.set(parent_renders.get() + 1);
			build("section", Props::new(), children![build(component(double_counter), Props::new(), children![])])
		})
	};

	let mount = runtime.render(build(parent, Props::new(), children![]), &container).unwrap();
	let section = surface.children(container)[0];
	let button = surface.children(section)[0];
	surface.dispatch(button, &Event::new("click"));

	assert_eq!(parent_renders.get(), 2);
	assert_eq!(mount.instance_count(), 2);
	assert_eq!(surface.to_html(container), "<main><section><button>2</button></section></main>");
}

fn subscribe(scope: &mut Scope<'_>) -> Node {
	let (email, set_email) = scope.use_state(String::new());
	let (submitted, set_submitted) = scope.use_state(false);

	if submitted {
		return build("p", Props::new().with("className", "subscribed"), children!["Thanks, ", email, "!"]);
	}
	build(
		"form",
		Props::new().on("submit", move |event| {
			event.prevent_default();
			set_submitted.set(true);
		}),
		children![build(
			"input",
			Props::new()
				.with("type", "email")
				.with("value", email)
				.on("input", move |event| set_email.set(event.value().unwrap_or_default().to_owned())),
			children![],
		)],
	)
}

#[test]
fn handlers_receive_event_data() {
	let (surface, container, runtime) = setup();

	runtime.render(mount(component(subscribe)), &container).unwrap();
	let form = surface.children(container)[0];
	let input = surface.children(form)[0];

	surface.dispatch(input, &Event::new("input").with_value("reader@example.com"));
	assert_eq!(surface.attribute(input, "value").as_deref(), Some("reader@example.com"));

	let submit = Event::new("submit");
	surface.dispatch(form, &submit);
	assert!(submit.default_prevented());
	assert_eq!(surface.to_html(container), r#"<main><p class="subscribed">Thanks, reader@example.com!</p></main>"#);
	assert_eq!(surface.handler_count(), 0);
}
