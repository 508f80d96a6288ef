//! The default balance shipped with the server.

use super::{BuildingAttack, BuildingData, Matchup, Ruleset, StartingUnit, TechData, TerrainKind, UnitData};
use crate::economy::Resources;
use crate::math::Fixed;

fn fx(value: f64) -> Fixed {
    Fixed::from_num(value)
}

fn cost(gold: i32, food: i32, wood: i32, stone: i32) -> Resources {
    Resources::whole(gold, food, wood, stone, 0)
}

fn unit(
    key: &str,
    name: &str,
    hp: f64,
    speed: f64,
    cost: Resources,
    upkeep: f64,
    (attack, range, attack_speed): (f64, f64, f64),
    vision: f64,
    train_time: f64,
) -> UnitData {
    UnitData {
        key: key.to_string(),
        name: name.to_string(),
        hp: fx(hp),
        speed: fx(speed),
        cost,
        upkeep: fx(upkeep),
        can_build: false,
        attack: fx(attack),
        range: fx(range),
        attack_speed: fx(attack_speed),
        vision: fx(vision),
        train_time: fx(train_time),
    }
}

fn building(key: &str, name: &str, hp: f64, cost: Resources, build_time: f64, vision: f64) -> BuildingData {
    BuildingData {
        key: key.to_string(),
        name: name.to_string(),
        hp: fx(hp),
        cost,
        build_time: fx(build_time),
        provides_pop: 0,
        production: Resources::ZERO,
        trains: Vec::new(),
        vision: fx(vision),
        footprint: 3,
        placement: None,
        attack: None,
    }
}

fn trains(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| (*k).to_string()).collect()
}

fn matchup(attacker: &str, defender: &str, multiplier: f64) -> Matchup {
    Matchup {
        attacker: attacker.to_string(),
        defender: defender.to_string(),
        multiplier: fx(multiplier),
    }
}

impl Ruleset {
    /// The standard balance: four unit types, nine buildings, three
    /// reference technologies.
    #[must_use]
    pub fn standard() -> Self {
        let mut builder = unit("BUILDER", "Builder", 50.0, 1.8, cost(0, 50, 0, 0), 0.1, (2.0, 1.0, 0.5), 8.0, 10.0);
        builder.can_build = true;

        let units = vec![
            builder,
            unit("INFANTRY", "Infantry", 100.0, 1.5, cost(10, 25, 0, 0), 0.2, (10.0, 1.0, 1.0), 7.0, 7.0),
            unit("ARCHER", "Archer", 70.0, 1.6, cost(25, 0, 25, 0), 0.25, (12.0, 6.0, 1.2), 9.0, 10.0),
            unit("CAVALRY", "Cavalry", 130.0, 2.5, cost(40, 60, 0, 0), 0.4, (15.0, 1.2, 0.9), 10.0, 20.0),
        ];

        let mut town_center = building("TOWN_CENTER", "Town Center", 2000.0, Resources::ZERO, 0.0, 12.0);
        town_center.provides_pop = 10;
        town_center.trains = trains(&["BUILDER", "INFANTRY"]);

        let mut house = building("HOUSE", "House", 250.0, cost(0, 0, 30, 0), 8.0, 3.0);
        house.provides_pop = 5;

        let mut farm = building("FARM", "Farm", 300.0, cost(0, 0, 50, 0), 10.0, 3.0);
        farm.production.food = fx(0.8);
        farm.placement = Some(TerrainKind::Plains);

        let mut sawmill = building("SAWMILL", "Sawmill", 300.0, cost(10, 0, 40, 0), 12.0, 3.0);
        sawmill.production.wood = fx(0.6);
        sawmill.placement = Some(TerrainKind::Forest);

        let mut mine = building("MINE", "Mine", 400.0, cost(0, 0, 80, 20), 15.0, 3.0);
        mine.production.gold = fx(0.25);
        mine.production.stone = fx(0.1);
        mine.placement = Some(TerrainKind::Mountain);

        let mut barracks = building("BARRACKS", "Barracks", 700.0, cost(0, 0, 100, 50), 20.0, 4.0);
        barracks.trains = trains(&["INFANTRY", "ARCHER"]);

        let mut stables = building("STABLES", "Stables", 800.0, cost(50, 0, 150, 0), 30.0, 4.0);
        stables.trains = trains(&["CAVALRY"]);

        let mut university = building("UNIVERSITY", "University", 500.0, cost(100, 0, 200, 0), 40.0, 4.0);
        university.production.science = fx(0.5);

        let mut tower = building("TOWER", "Tower", 500.0, cost(0, 0, 75, 125), 25.0, 10.0);
        tower.footprint = 2;
        tower.attack = Some(BuildingAttack {
            damage: fx(20.0),
            range: fx(8.0),
            attack_speed: fx(1.5),
        });

        let buildings = vec![
            town_center, house, farm, sawmill, mine, barracks, stables, university, tower,
        ];

        let technologies = vec![
            TechData {
                key: "IMPROVED_AGRICULTURE".to_string(),
                name: "Improved Agriculture".to_string(),
                cost: Resources::whole(0, 0, 0, 0, 50),
                description: "+20% food production".to_string(),
            },
            TechData {
                key: "SMITHING".to_string(),
                name: "Smithing".to_string(),
                cost: Resources::whole(0, 0, 0, 0, 100),
                description: "+10% unit attack".to_string(),
            },
            TechData {
                key: "FORTIFICATION".to_string(),
                name: "Fortification".to_string(),
                cost: Resources::whole(0, 0, 0, 0, 75),
                description: "+20% building hit points".to_string(),
            },
        ];

        let matchups = vec![
            matchup("INFANTRY", "CAVALRY", 1.5),
            matchup("INFANTRY", "ARCHER", 0.75),
            matchup("ARCHER", "INFANTRY", 1.5),
            matchup("ARCHER", "CAVALRY", 0.75),
            matchup("CAVALRY", "ARCHER", 1.5),
            matchup("CAVALRY", "INFANTRY", 0.75),
        ];

        let starting_units = vec![
            StartingUnit { unit: "BUILDER".to_string(), offset_x: fx(4.0), offset_y: fx(1.0) },
            StartingUnit { unit: "INFANTRY".to_string(), offset_x: fx(-1.0), offset_y: fx(1.0) },
            StartingUnit { unit: "INFANTRY".to_string(), offset_x: fx(1.5), offset_y: fx(4.0) },
        ];

        let player_colors = [
            "#4caf50", "#f44336", "#2196f3", "#ffc107", "#9c27b0", "#ff9800", "#00bcd4", "#e91e63",
        ]
        .iter()
        .map(|c| (*c).to_string())
        .collect();

        Self {
            units,
            buildings,
            technologies,
            matchups,
            starting_resources: Resources::whole(200, 150, 100, 50, 0),
            headquarters: "TOWN_CENTER".to_string(),
            starting_units,
            player_colors,
        }
    }
}
